//! Payment destinations and their canonical address form.
//!
//! The service identifies balances and wallet entries by address string.
//! Every destination is resolved through its output script under the
//! client network; colored (Open Assets) addresses keep their own
//! encoding so colored balances are not silently downgraded.

use std::str::FromStr;

use bitcoin::address::NetworkUnchecked;
use bitcoin::hashes::Hash;
use bitcoin::{base58, Address, Network, NetworkKind, PubkeyHash, PublicKey, Script, ScriptBuf, ScriptHash};

use crate::error::ClientError;

// ==============================================================================
// Colored Address
// ==============================================================================

/// Open Assets version prefix, identical on mainnet and testnet.
const COLORED_PREFIX: u8 = 0x13;

const P2PKH_MAIN: u8 = 0x00;
const P2PKH_TEST: u8 = 0x6f;
const P2SH_MAIN: u8 = 0x05;
const P2SH_TEST: u8 = 0xc4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ColoredKind {
    P2pkh,
    P2sh,
}

/// An Open Assets colored address: Base58Check of
/// `0x13 || version || hash160` over a P2PKH or P2SH address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColoredAddress {
    kind: ColoredKind,
    hash: [u8; 20],
    network: NetworkKind,
}

impl ColoredAddress {
    /// Wrap a plain P2PKH or P2SH output script. Other script kinds have
    /// no colored encoding.
    pub fn from_script(script: &Script, network: impl Into<NetworkKind>) -> Option<Self> {
        let bytes = script.as_bytes();
        let (kind, hash) = if script.is_p2pkh() {
            (ColoredKind::P2pkh, &bytes[3..23])
        } else if script.is_p2sh() {
            (ColoredKind::P2sh, &bytes[2..22])
        } else {
            return None;
        };
        Some(Self {
            kind,
            hash: hash.try_into().ok()?,
            network: network.into(),
        })
    }

    pub fn from_address(address: &Address, network: impl Into<NetworkKind>) -> Option<Self> {
        Self::from_script(address.script_pubkey().as_script(), network)
    }

    pub fn network_kind(&self) -> NetworkKind {
        self.network
    }

    /// Output script of the underlying plain address.
    pub fn script_pubkey(&self) -> ScriptBuf {
        match self.kind {
            ColoredKind::P2pkh => ScriptBuf::new_p2pkh(&PubkeyHash::from_byte_array(self.hash)),
            ColoredKind::P2sh => ScriptBuf::new_p2sh(&ScriptHash::from_byte_array(self.hash)),
        }
    }

    fn version(&self) -> u8 {
        match (self.kind, self.network) {
            (ColoredKind::P2pkh, NetworkKind::Main) => P2PKH_MAIN,
            (ColoredKind::P2pkh, NetworkKind::Test) => P2PKH_TEST,
            (ColoredKind::P2sh, NetworkKind::Main) => P2SH_MAIN,
            (ColoredKind::P2sh, NetworkKind::Test) => P2SH_TEST,
        }
    }
}

impl std::fmt::Display for ColoredAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut payload = Vec::with_capacity(22);
        payload.push(COLORED_PREFIX);
        payload.push(self.version());
        payload.extend_from_slice(&self.hash);
        f.write_str(&base58::encode_check(&payload))
    }
}

impl FromStr for ColoredAddress {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| {
            ClientError::InvalidArgument(format!("`{s}` is not a colored address: {reason}"))
        };
        let payload = base58::decode_check(s).map_err(|e| invalid(&e.to_string()))?;
        if payload.len() != 22 || payload[0] != COLORED_PREFIX {
            return Err(invalid("unexpected prefix or length"));
        }
        let (kind, network) = match payload[1] {
            P2PKH_MAIN => (ColoredKind::P2pkh, NetworkKind::Main),
            P2PKH_TEST => (ColoredKind::P2pkh, NetworkKind::Test),
            P2SH_MAIN => (ColoredKind::P2sh, NetworkKind::Main),
            P2SH_TEST => (ColoredKind::P2sh, NetworkKind::Test),
            other => return Err(invalid(&format!("unknown address version {other:#04x}"))),
        };
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&payload[2..]);
        Ok(Self {
            kind,
            hash,
            network,
        })
    }
}

// ==============================================================================
// Destination
// ==============================================================================

/// Anything the service can track a balance for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Address(Address),
    /// Pays to the P2PKH of the key.
    PublicKey(PublicKey),
    /// A raw output script.
    Script(ScriptBuf),
    Colored(ColoredAddress),
}

impl Destination {
    /// Destination paying to the P2SH of `redeem_script`.
    pub fn p2sh(redeem_script: &Script) -> Self {
        Self::Script(ScriptBuf::new_p2sh(&redeem_script.script_hash()))
    }

    /// Parse an address or colored address string that must belong to
    /// `network`.
    pub fn parse(s: &str, network: Network) -> Result<Self, ClientError> {
        let s = s.trim();
        if let Ok(colored) = s.parse::<ColoredAddress>() {
            if colored.network_kind() != NetworkKind::from(network) {
                return Err(ClientError::InvalidArgument(format!(
                    "colored address `{s}` does not belong to {network}"
                )));
            }
            return Ok(Self::Colored(colored));
        }
        let address = s
            .parse::<Address<NetworkUnchecked>>()
            .map_err(|e| ClientError::InvalidArgument(format!("invalid address `{s}`: {e}")))?
            .require_network(network)
            .map_err(|e| ClientError::InvalidArgument(format!("address `{s}`: {e}")))?;
        Ok(Self::Address(address))
    }

    pub fn script_pubkey(&self) -> ScriptBuf {
        match self {
            Self::Address(address) => address.script_pubkey(),
            Self::PublicKey(key) => ScriptBuf::new_p2pkh(&key.pubkey_hash()),
            Self::Script(script) => script.clone(),
            Self::Colored(colored) => colored.script_pubkey(),
        }
    }

    /// Canonical address string the service expects for this destination.
    pub fn to_api_address(&self, network: Network) -> Result<String, ClientError> {
        let script = self.script_pubkey();
        let address = Address::from_script(&script, network).map_err(|e| {
            ClientError::InvalidArgument(format!(
                "{self} does not represent a valid bitcoin address ({e})"
            ))
        })?;
        match self {
            Self::Colored(colored) => Ok(colored.to_string()),
            _ => Ok(address.to_string()),
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Address(address) => write!(f, "address {address}"),
            Self::PublicKey(key) => write!(f, "public key {key}"),
            Self::Script(script) => write!(f, "script {}", script.to_hex_string()),
            Self::Colored(colored) => write!(f, "colored address {colored}"),
        }
    }
}

impl From<Address> for Destination {
    fn from(address: Address) -> Self {
        Self::Address(address)
    }
}

impl From<PublicKey> for Destination {
    fn from(key: PublicKey) -> Self {
        Self::PublicKey(key)
    }
}

impl From<ScriptBuf> for Destination {
    fn from(script: ScriptBuf) -> Self {
        Self::Script(script)
    }
}

impl From<ColoredAddress> for Destination {
    fn from(colored: ColoredAddress) -> Self {
        Self::Colored(colored)
    }
}
