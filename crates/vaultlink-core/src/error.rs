//! Error types for the vaultlink-core crate

use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur in file and share-link operations
///
/// Access refusals (expired, consumed, wrong password) are not errors; they
/// are outcomes returned by the resolver. Errors here are input validation,
/// authorization of owner operations, and collaborator failures.
#[derive(Error, Debug)]
pub enum CoreError {
    /// File not found, or not owned by the caller
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// Share link not found, or not owned by the caller
    #[error("share link not found")]
    LinkNotFound,

    /// An E2EE link was requested for a file uploaded without encryption
    #[error("policy does not match file: {0}")]
    PolicyFileMismatch(String),

    /// Link policy failed validation
    #[error("invalid link policy: {0}")]
    InvalidPolicy(String),

    /// Malformed request input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A share URL could not be parsed
    #[error("invalid share url: {0}")]
    InvalidShareUrl(String),

    /// A freshly minted token already exists
    #[error("share token collision")]
    TokenCollision,

    /// Access denied
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Metadata persistence failure
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Object storage failure
    #[error("storage error: {0}")]
    Storage(#[from] vaultlink_store::StoreError),

    /// Crypto error
    #[error("crypto error: {0}")]
    Crypto(#[from] vaultlink_crypto::CryptoError),
}
