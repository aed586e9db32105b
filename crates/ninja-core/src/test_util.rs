//! Shared test helpers for `ninja-core` unit tests.

use std::str::FromStr;

use bitcoin::address::NetworkUnchecked;
use bitcoin::bip32::{DerivationPath, Xpriv, Xpub};
use bitcoin::opcodes::all::OP_CHECKMULTISIG;
use bitcoin::script::Builder;
use bitcoin::secp256k1::Secp256k1;
use bitcoin::hashes::Hash;
use bitcoin::{
    absolute, transaction, Address, Amount, Network, NetworkKind, OutPoint, PublicKey, ScriptBuf,
    Sequence, Transaction, TxIn, TxOut, Txid, Witness,
};

use crate::client::NinjaClient;
use crate::transport::mock::MockTransport;
use crate::types::HdKeySet;

pub const MAINNET_ADDRESS: &str = "1BoatSLRHtKNngkdXEeobR76b53LETtpyT";
pub const BASE: &str = "http://ninja.test/";

// ==============================================================================
// Bitcoin Values
// ==============================================================================

pub fn mainnet_address() -> Address {
    MAINNET_ADDRESS
        .parse::<Address<NetworkUnchecked>>()
        .expect("static address must parse")
        .require_network(Network::Bitcoin)
        .expect("static address is mainnet")
}

/// Create a deterministic `Txid` from a single distinguishing byte.
pub fn txid_from_byte(b: u8) -> Txid {
    let mut bytes = [0u8; 32];
    bytes[0] = b;
    Txid::from_byte_array(bytes)
}

/// One-input, one-output transaction paying to [`MAINNET_ADDRESS`].
pub fn sample_transaction() -> Transaction {
    Transaction {
        version: transaction::Version::TWO,
        lock_time: absolute::LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint::new(txid_from_byte(1), 0),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(50_000),
            script_pubkey: mainnet_address().script_pubkey(),
        }],
    }
}

/// Compressed public key of the secp256k1 generator point.
pub fn generator_pubkey() -> PublicKey {
    PublicKey::from_str("0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798")
        .expect("generator point is a valid key")
}

/// 1-of-1 bare multisig over the generator key.
pub fn multisig_redeem_script() -> ScriptBuf {
    Builder::new()
        .push_int(1)
        .push_key(&generator_pubkey())
        .push_int(1)
        .push_opcode(OP_CHECKMULTISIG)
        .into_script()
}

pub fn op_return_script() -> ScriptBuf {
    ScriptBuf::from_bytes(vec![0x6a, 0x03, 0x01, 0x02, 0x03])
}

/// Deterministic extended public key derived from a one-byte seed.
pub fn xpub(seed: u8, network: NetworkKind) -> Xpub {
    let secp = Secp256k1::new();
    let xpriv = Xpriv::new_master(network, &[seed; 32]).expect("32-byte seed is valid");
    Xpub::from_priv(&secp, &xpriv)
}

pub fn sample_keyset(name: &str, network: NetworkKind) -> HdKeySet {
    HdKeySet {
        name: name.to_owned(),
        ext_pub_keys: vec![xpub(1, network), xpub(2, network)],
        signature_count: 2,
        path: Some(DerivationPath::from_str("m/44'/0'/0'").expect("static path must parse")),
    }
}

// ==============================================================================
// Clients
// ==============================================================================

/// Client on `network` wired to a fresh mock transport.
pub fn mock_client(network: Network) -> (NinjaClient, MockTransport) {
    let transport = MockTransport::new();
    let client = NinjaClient::with_transport(BASE, network, transport.clone())
        .expect("static base address must parse");
    (client, transport)
}
