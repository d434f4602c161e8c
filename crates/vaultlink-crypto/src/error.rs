//! Error types for the vaultlink-crypto crate

use thiserror::Error;

/// Result type alias using `CryptoError`
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors that can occur during cryptographic operations
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Key pair generation failed; nothing was persisted
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Encryption failed
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// The wrapped content key could not be unwrapped with this private key
    #[error("key unwrap failed: {0}")]
    KeyUnwrap(String),

    /// The unwrapped content key has the wrong length
    #[error("content key length mismatch: expected {expected} bytes, got {actual}")]
    KeyLengthMismatch { expected: usize, actual: usize },

    /// Authentication tag verification failed
    #[error("decryption integrity check failed")]
    DecryptionIntegrity,

    /// Invalid key format or length
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Invalid nonce
    #[error("invalid nonce: {0}")]
    InvalidNonce(String),

    /// Password hashing or hash parsing failed
    #[error("password hash error: {0}")]
    PasswordHash(String),

    /// A private key already exists for this principal
    #[error("key already exists for principal {0}")]
    KeyAlreadyExists(String),

    /// Key store backend failure
    #[error("key store error: {0}")]
    KeyStore(String),

    /// No public key is registered for this principal
    #[error("no public key registered for principal {0}")]
    PublicKeyNotFound(String),

    /// Public key directory failure
    #[error("key directory error: {0}")]
    Directory(String),

    /// A blocking crypto task was cancelled or panicked
    #[error("crypto task failed: {0}")]
    Task(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Base64 decode error
    #[error("base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}

impl From<tokio::task::JoinError> for CryptoError {
    fn from(err: tokio::task::JoinError) -> Self {
        CryptoError::Task(err.to_string())
    }
}
