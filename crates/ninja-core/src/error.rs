use bitcoin::Network;
use serde::{Deserialize, Serialize};

/// Structured error payload returned by the service on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    #[serde(default)]
    pub status_code: u16,
    #[serde(default)]
    pub message: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.status_code)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("network not supported: {0}")]
    NotSupported(Network),

    #[error("API error: {0}")]
    Api(ApiError),

    #[error("HTTP request failed with status {status}")]
    Http { status: u16 },

    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ClientError {
    /// Status code carried by a typed API error or a generic HTTP failure.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api(err) => Some(err.status_code),
            Self::Http { status } => Some(*status),
            _ => None,
        }
    }

    /// True when the service reported that the resource already exists.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Api(err) if err.status_code == 409)
    }
}
