//! Wire models for the QBit Ninja API.
//!
//! Field names follow the service's camelCase JSON. Amounts travel as
//! satoshi integers, scripts and consensus-encoded structures as hex.

use std::str::FromStr;

use bitcoin::address::NetworkUnchecked;
use bitcoin::bip32::{DerivationPath, Xpub};
use bitcoin::{block, Address, Amount, Block, BlockHash, PublicKey, ScriptBuf, SignedAmount, Transaction, Txid};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

// ==============================================================================
// Block Feature
// ==============================================================================

/// Identifies a block by height, hash, or offset from the chain tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockFeature {
    Height(u32),
    Hash(BlockHash),
    /// The current tip moved by `offset` blocks (`last-1` is the tip's parent).
    Last { offset: i32 },
}

impl BlockFeature {
    pub fn last() -> Self {
        Self::Last { offset: 0 }
    }
}

impl std::fmt::Display for BlockFeature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Height(height) => write!(f, "{height}"),
            Self::Hash(hash) => write!(f, "{hash}"),
            Self::Last { offset: 0 } => f.write_str("last"),
            Self::Last { offset } if *offset > 0 => write!(f, "last+{offset}"),
            Self::Last { offset } => write!(f, "last{offset}"),
        }
    }
}

impl FromStr for BlockFeature {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ClientError::InvalidArgument(format!("invalid block feature `{s}`"));
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();

        if let Some(rest) = lower.strip_prefix("last").or_else(|| lower.strip_prefix("tip")) {
            if rest.is_empty() {
                return Ok(Self::last());
            }
            let digits = rest.strip_prefix(['+', '-']).ok_or_else(invalid)?;
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            let offset = rest
                .strip_prefix('+')
                .unwrap_or(rest)
                .parse::<i32>()
                .map_err(|_| invalid())?;
            return Ok(Self::Last { offset });
        }
        if trimmed.len() < 64 && !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return trimmed.parse().map(Self::Height).map_err(|_| invalid());
        }
        trimmed.parse().map(Self::Hash).map_err(|_| invalid())
    }
}

// ==============================================================================
// Wallets
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletModel {
    pub name: String,
}

/// Request body registering an address in a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertWalletAddress {
    /// Normalized address string (plain or colored).
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redeem_script: Option<ScriptBuf>,
    /// Associate past chain activity of the address with the wallet.
    #[serde(default)]
    pub merge_past: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAddress {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redeem_script: Option<ScriptBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<serde_json::Value>,
}

// ==============================================================================
// HD Keysets
// ==============================================================================

/// Named group of extended public keys with a signature threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HdKeySet {
    pub name: String,
    pub ext_pub_keys: Vec<Xpub>,
    pub signature_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "key_path::opt")]
    pub path: Option<DerivationPath>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HdKeyState {
    pub next_unused: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeySetData {
    pub key_set: HdKeySet,
    pub state: HdKeyState,
}

/// A key generated from a keyset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HdKeyData {
    pub address: Address<NetworkUnchecked>,
    pub script_pub_key: ScriptBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redeem_script: Option<ScriptBuf>,
    #[serde(with = "key_path")]
    pub path: DerivationPath,
    #[serde(default)]
    pub pub_keys: Vec<PublicKey>,
}

impl HdKeyData {
    /// The generated address. Network membership is verified when the
    /// response is decoded.
    pub fn address(&self) -> &Address {
        self.address.assume_checked_ref()
    }
}

// ==============================================================================
// Balances
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coin {
    pub transaction_id: Txid,
    pub index: u32,
    #[serde(with = "bitcoin::amount::serde::as_sat")]
    pub value: Amount,
    pub script_pub_key: ScriptBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redeem_script: Option<ScriptBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceOperation {
    #[serde(with = "bitcoin::amount::serde::as_sat")]
    pub amount: SignedAmount,
    pub confirmations: u32,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub block_id: Option<BlockHash>,
    pub transaction_id: Txid,
    #[serde(default)]
    pub received_coins: Vec<Coin>,
    #[serde(default)]
    pub spent_coins: Vec<Coin>,
    #[serde(default)]
    pub first_seen: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceModel {
    #[serde(default)]
    pub operations: Vec<BalanceOperation>,
    #[serde(default)]
    pub continuation: Option<String>,
    #[serde(default)]
    pub conflicted_operations: Vec<BalanceOperation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetBalance {
    pub asset: String,
    pub quantity: i64,
    #[serde(default)]
    pub received: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSummaryDetails {
    pub transaction_count: u64,
    #[serde(with = "bitcoin::amount::serde::as_sat")]
    pub amount: SignedAmount,
    #[serde(default, with = "bitcoin::amount::serde::as_sat")]
    pub received: SignedAmount,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assets: Vec<AssetBalance>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSummary {
    #[serde(rename = "unConfirmed")]
    pub unconfirmed: BalanceSummaryDetails,
    pub confirmed: BalanceSummaryDetails,
    #[serde(default)]
    pub spendable: BalanceSummaryDetails,
    #[serde(default)]
    pub immature: BalanceSummaryDetails,
    #[serde(default)]
    pub older_immature: Option<u32>,
    #[serde(default)]
    pub cache_hit: Option<String>,
}

// ==============================================================================
// Blocks & Transactions
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInformation {
    pub block_id: BlockHash,
    #[serde(with = "consensus_hex")]
    pub block_header: block::Header,
    pub height: u32,
    pub confirmations: u32,
    #[serde(default)]
    pub median_time_past: Option<String>,
    #[serde(default)]
    pub block_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetBlockResponse {
    pub additional_information: BlockInformation,
    /// Full block, absent when only the header was requested.
    #[serde(default, with = "consensus_hex::opt")]
    pub block: Option<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTransactionResponse {
    #[serde(with = "consensus_hex")]
    pub transaction: Transaction,
    pub transaction_id: Txid,
    #[serde(default)]
    pub is_coinbase: bool,
    #[serde(default)]
    pub block: Option<BlockInformation>,
    #[serde(default)]
    pub spent_coins: Vec<Coin>,
    #[serde(default)]
    pub received_coins: Vec<Coin>,
    #[serde(default)]
    pub first_seen: Option<String>,
    #[serde(default, with = "bitcoin::amount::serde::as_sat")]
    pub fees: Amount,
}

// ==============================================================================
// Serde Helpers
// ==============================================================================

/// Consensus-encoded structures carried as hex strings.
mod consensus_hex {
    use bitcoin::consensus::encode::{deserialize_hex, serialize_hex};
    use bitcoin::consensus::{Decodable, Encodable};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<T: Encodable, S: Serializer>(value: &T, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&serialize_hex(value))
    }

    pub fn deserialize<'de, T: Decodable, D: Deserializer<'de>>(d: D) -> Result<T, D::Error> {
        let hex = String::deserialize(d)?;
        deserialize_hex(&hex).map_err(serde::de::Error::custom)
    }

    pub mod opt {
        use super::*;

        pub fn serialize<T: Encodable, S: Serializer>(
            value: &Option<T>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => s.serialize_some(&serialize_hex(value)),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, T: Decodable, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<T>, D::Error> {
            match Option::<String>::deserialize(d)? {
                Some(hex) if !hex.is_empty() => deserialize_hex(&hex)
                    .map(Some)
                    .map_err(serde::de::Error::custom),
                _ => Ok(None),
            }
        }
    }
}

/// Derivation paths without the leading `m/`, e.g. `44'/0'/0'`.
mod key_path {
    use std::str::FromStr;

    use bitcoin::bip32::DerivationPath;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn to_wire(path: &DerivationPath) -> String {
        let full = path.to_string();
        let bare = full.strip_prefix('m').unwrap_or(&full);
        bare.trim_start_matches('/').to_owned()
    }

    pub(super) fn from_wire(raw: &str) -> Result<DerivationPath, bitcoin::bip32::Error> {
        let raw = raw.trim();
        let bare = raw.strip_prefix('m').unwrap_or(raw).trim_start_matches('/');
        if bare.is_empty() {
            return Ok(DerivationPath::master());
        }
        DerivationPath::from_str(&format!("m/{bare}"))
    }

    pub fn serialize<S: Serializer>(path: &DerivationPath, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&to_wire(path))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DerivationPath, D::Error> {
        let raw = String::deserialize(d)?;
        from_wire(&raw).map_err(serde::de::Error::custom)
    }

    pub mod opt {
        use super::*;

        pub fn serialize<S: Serializer>(
            path: &Option<DerivationPath>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match path {
                Some(path) => s.serialize_some(&to_wire(path)),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DerivationPath>, D::Error> {
            match Option::<String>::deserialize(d)? {
                Some(raw) => from_wire(&raw).map(Some).map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }
    }
}
