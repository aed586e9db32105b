//! Network-aware request/response body encoding.
//!
//! Raw byte and raw text responses bypass JSON entirely; every other
//! response model is decoded with `serde_json` and then checked against
//! the client network, since addresses and extended keys inside payloads
//! carry a network-specific encoding.

use bitcoin::bip32::Xpub;
use bitcoin::{Network, NetworkKind};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::destination::Destination;
use crate::error::{ApiError, ClientError};
use crate::types::{
    BalanceModel, BalanceSummary, GetBlockResponse, GetTransactionResponse, HdKeyData, HdKeySet,
    KeySetData, WalletAddress, WalletModel,
};

/// Encoder/decoder bound to one network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    network: Network,
}

impl Codec {
    pub fn new(network: Network) -> Self {
        Self { network }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn encode<T: Serialize + ?Sized>(&self, body: &T) -> Result<String, ClientError> {
        Ok(serde_json::to_string(body)?)
    }

    pub fn decode<T: Payload>(&self, body: Vec<u8>) -> Result<T, ClientError> {
        T::from_body(body, self)
    }

    /// Decode a success response body. An empty (or blank) body means no
    /// value for JSON models; raw payloads keep it as-is.
    pub fn decode_response<T: Payload>(&self, body: Vec<u8>) -> Result<Option<T>, ClientError> {
        if T::BLANK_IS_NONE && body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        self.decode(body).map(Some)
    }

    /// Structured API error from an error response body, if it is one.
    ///
    /// A body that is not valid JSON or does not match the error shape
    /// yields `None`, as does an error carrying a zero status code.
    pub fn decode_api_error(&self, body: &str) -> Option<ApiError> {
        match serde_json::from_str::<ApiError>(body) {
            Ok(error) if error.status_code != 0 => Some(error),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(error = %e, "error body is not a structured API error");
                None
            }
        }
    }

    fn decode_json<T: JsonPayload>(&self, body: &[u8]) -> Result<T, ClientError> {
        let value: T = serde_json::from_slice(body).map_err(|e| {
            ClientError::Decode(format!(
                "{e}; body={}",
                String::from_utf8_lossy(body)
            ))
        })?;
        value.check_network(self.network)?;
        Ok(value)
    }
}

/// A response body type.
pub trait Payload: Sized {
    /// Whether a blank success body decodes to no value.
    const BLANK_IS_NONE: bool = true;

    fn from_body(body: Vec<u8>, codec: &Codec) -> Result<Self, ClientError>;
}

impl Payload for Vec<u8> {
    const BLANK_IS_NONE: bool = false;

    fn from_body(body: Vec<u8>, _codec: &Codec) -> Result<Self, ClientError> {
        Ok(body)
    }
}

impl Payload for String {
    const BLANK_IS_NONE: bool = false;

    fn from_body(body: Vec<u8>, _codec: &Codec) -> Result<Self, ClientError> {
        String::from_utf8(body).map_err(|e| ClientError::Decode(format!("non UTF-8 body: {e}")))
    }
}

/// A JSON response model.
pub trait JsonPayload: DeserializeOwned {
    /// Reject values whose embedded addresses or keys belong to another
    /// network. Models that only carry scripts, amounts and hashes have
    /// nothing to check.
    fn check_network(&self, _network: Network) -> Result<(), ClientError> {
        Ok(())
    }
}

macro_rules! json_payload {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Payload for $ty {
                fn from_body(body: Vec<u8>, codec: &Codec) -> Result<Self, ClientError> {
                    codec.decode_json(&body)
                }
            }

            impl Payload for Vec<$ty> {
                fn from_body(body: Vec<u8>, codec: &Codec) -> Result<Self, ClientError> {
                    codec.decode_json(&body)
                }
            }
        )*
    };
}

json_payload!(
    WalletModel,
    WalletAddress,
    HdKeySet,
    KeySetData,
    HdKeyData,
    BalanceModel,
    BalanceSummary,
    GetBlockResponse,
    GetTransactionResponse,
);

impl<T: JsonPayload> JsonPayload for Vec<T> {
    fn check_network(&self, network: Network) -> Result<(), ClientError> {
        self.iter().try_for_each(|item| item.check_network(network))
    }
}

impl JsonPayload for WalletModel {}
impl JsonPayload for BalanceModel {}
impl JsonPayload for BalanceSummary {}
impl JsonPayload for GetBlockResponse {}
impl JsonPayload for GetTransactionResponse {}

impl JsonPayload for WalletAddress {
    fn check_network(&self, network: Network) -> Result<(), ClientError> {
        Destination::parse(&self.address, network)
            .map(|_| ())
            .map_err(|e| ClientError::Decode(format!("wallet address rejected: {e}")))
    }
}

impl JsonPayload for HdKeySet {
    fn check_network(&self, network: Network) -> Result<(), ClientError> {
        let expected = NetworkKind::from(network);
        match self.ext_pub_keys.iter().find(|key| key.network != expected) {
            Some(key) => Err(ClientError::Decode(format!(
                "keyset `{}` holds extended key {key} from another network than {network}",
                self.name
            ))),
            None => Ok(()),
        }
    }
}

impl JsonPayload for KeySetData {
    fn check_network(&self, network: Network) -> Result<(), ClientError> {
        self.key_set.check_network(network)
    }
}

impl JsonPayload for HdKeyData {
    fn check_network(&self, network: Network) -> Result<(), ClientError> {
        if self.address.is_valid_for_network(network) {
            Ok(())
        } else {
            Err(ClientError::Decode(format!(
                "generated address {} does not belong to {network}",
                self.address.assume_checked_ref()
            )))
        }
    }
}

/// Re-encode extended keys for `network` before they are sent.
pub(crate) fn stamp_network(keys: &mut [Xpub], network: Network) {
    let kind = NetworkKind::from(network);
    for key in keys {
        key.network = kind;
    }
}
