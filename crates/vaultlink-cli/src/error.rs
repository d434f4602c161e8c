//! Error types and API error codes

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use vaultlink_core::CoreError;
use vaultlink_crypto::CryptoError;
use vaultlink_store::StoreError;

/// Closed set of error codes returned in API error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    AccessDenied,
    MissingToken,
    InvalidToken,
    InvalidRequest,
    InvalidPolicy,
    PolicyFileMismatch,
    FileNotFound,
    LinkNotFound,
    KeyNotFound,
    KeyConflict,
    PayloadTooLarge,
    SlowDown,
    InternalError,
}

impl ErrorCode {
    /// Get the error code string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessDenied => "AccessDenied",
            Self::MissingToken => "MissingToken",
            Self::InvalidToken => "InvalidToken",
            Self::InvalidRequest => "InvalidRequest",
            Self::InvalidPolicy => "InvalidPolicy",
            Self::PolicyFileMismatch => "PolicyFileMismatch",
            Self::FileNotFound => "FileNotFound",
            Self::LinkNotFound => "LinkNotFound",
            Self::KeyNotFound => "KeyNotFound",
            Self::KeyConflict => "KeyConflict",
            Self::PayloadTooLarge => "PayloadTooLarge",
            Self::SlowDown => "SlowDown",
            Self::InternalError => "InternalError",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::MissingToken | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::InvalidRequest | Self::InvalidPolicy | Self::PolicyFileMismatch => {
                StatusCode::BAD_REQUEST
            }
            Self::FileNotFound | Self::LinkNotFound | Self::KeyNotFound => StatusCode::NOT_FOUND,
            Self::KeyConflict => StatusCode::CONFLICT,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::SlowDown => StatusCode::TOO_MANY_REQUESTS,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    Api {
        code: ErrorCode,
        message: String,
        request_id: String,
    },

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl ApiError {
    /// Create a new error with a code
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            message: message.into(),
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Get the error code
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Api { code, .. } => *code,
            Self::Internal(_) => ErrorCode::InternalError,
            Self::Core(e) => match e {
                CoreError::FileNotFound(_) => ErrorCode::FileNotFound,
                CoreError::LinkNotFound => ErrorCode::LinkNotFound,
                CoreError::PolicyFileMismatch(_) => ErrorCode::PolicyFileMismatch,
                CoreError::InvalidPolicy(_) => ErrorCode::InvalidPolicy,
                CoreError::InvalidInput(_) | CoreError::InvalidShareUrl(_) => {
                    ErrorCode::InvalidRequest
                }
                CoreError::AccessDenied(_) => ErrorCode::AccessDenied,
                CoreError::Storage(StoreError::NotFound(_)) => ErrorCode::FileNotFound,
                _ => ErrorCode::InternalError,
            },
            Self::Crypto(e) => match e {
                CryptoError::InvalidKey(_) | CryptoError::InvalidNonce(_) => {
                    ErrorCode::InvalidRequest
                }
                CryptoError::PublicKeyNotFound(_) => ErrorCode::KeyNotFound,
                _ => ErrorCode::InternalError,
            },
        }
    }

    /// Message safe to return to the caller
    fn public_message(&self) -> String {
        match self.error_code() {
            // Collaborator failures stay in the logs
            ErrorCode::InternalError => "internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    code: &'a str,
    message: String,
    request_id: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.error_code();
        let status = code.status_code();
        let request_id = match &self {
            ApiError::Api { request_id, .. } => request_id.clone(),
            _ => uuid::Uuid::new_v4().to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, request_id = %request_id, "Request failed");
        } else {
            tracing::debug!(code = code.as_str(), request_id = %request_id, "Request rejected");
        }

        let body = ErrorBody {
            code: code.as_str(),
            message: self.public_message(),
            request_id: &request_id,
        };

        (
            status,
            [("x-request-id", request_id.as_str())],
            Json(body),
        )
            .into_response()
    }
}
