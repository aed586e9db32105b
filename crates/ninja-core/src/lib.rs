//! Typed async client for the QBit Ninja block explorer and wallet
//! indexing API.
//!
//! [`NinjaClient`] turns addresses, transactions, wallets, HD keysets and
//! block references into requests against the service's JSON REST API
//! and decodes the responses into the models in [`types`].

pub mod client;
pub mod codec;
pub mod destination;
pub mod endpoint;
pub mod error;
pub mod path;
pub mod transport;
pub mod types;
pub mod wallet;

#[cfg(test)]
pub(crate) mod test_util;

pub use client::{create_if_not_exists, NinjaClient};
pub use destination::{ColoredAddress, Destination};
pub use error::{ApiError, ClientError};
pub use types::BlockFeature;
pub use wallet::{KeySetClient, WalletClient};
