//! Client error types

use serde::Deserialize;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Error body returned by the gateway
    #[error("API error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        request_id: Option<String>,
    },

    /// A share link refused access (`expired`, `consumed`, `viewOnly`, ...)
    #[error("share access refused: {0}")]
    Refused(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Encryption or key management error
    #[error("Crypto error: {0}")]
    Crypto(#[from] vaultlink_crypto::CryptoError),

    /// Malformed share URL or other model error
    #[error(transparent)]
    Core(#[from] vaultlink_core::CoreError),

    /// Unexpected response shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    code: String,
    message: String,
    request_id: Option<String>,
}

impl ClientError {
    /// Build an API error from a non-success response body
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => Self::Api {
                status,
                code: parsed.code,
                message: parsed.message,
                request_id: parsed.request_id,
            },
            Err(_) => Self::Api {
                status,
                code: format!("HTTP{}", status),
                message: if body.is_empty() {
                    "Unknown error".to_string()
                } else {
                    body.to_string()
                },
                request_id: None,
            },
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }

    /// Check if this is an access denied error
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::Api { status: 401 | 403, .. })
    }
}
