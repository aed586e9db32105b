//! HTTP transport abstraction.
//!
//! Defines the [`Transport`] trait used by the request engine and the
//! `reqwest` implementation ([`HttpTransport`]), plus a test mock
//! (`mock::MockTransport`).

mod http;
#[cfg(test)]
pub mod mock;

pub use http::HttpTransport;

use async_trait::async_trait;
use reqwest::Method;

use crate::error::ClientError;

/// One outgoing HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// JSON payload, sent as `application/json`.
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes HTTP exchanges for the client.
///
/// Implementations must not retry, and must release any connection they
/// hold when the returned future is dropped.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ClientError>;
}
