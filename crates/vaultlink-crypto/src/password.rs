//! Link password hashing with Argon2id
//!
//! Hashes are PHC strings (`$argon2id$v=19$...`) carrying their own salt and
//! parameters, so verification needs nothing but the stored string.

use crate::{CryptoError, Result};
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use zeroize::Zeroizing;

/// Hash a password on the current thread
pub fn hash_password_blocking(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand_core::OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CryptoError::PasswordHash(e.to_string()))
}

/// Verify a password against a stored PHC hash on the current thread
///
/// A wrong password is `Ok(false)`; a malformed hash is an error.
pub fn verify_password_blocking(password: &str, phc: &str) -> Result<bool> {
    let parsed = PasswordHash::new(phc).map_err(|e| CryptoError::PasswordHash(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CryptoError::PasswordHash(e.to_string())),
    }
}

/// Hash a password on the blocking pool
pub async fn hash_password(password: &str) -> Result<String> {
    let password = Zeroizing::new(password.to_string());
    tokio::task::spawn_blocking(move || hash_password_blocking(&password)).await?
}

/// Verify a password on the blocking pool
pub async fn verify_password(password: &str, phc: &str) -> Result<bool> {
    let password = Zeroizing::new(password.to_string());
    let phc = phc.to_string();
    tokio::task::spawn_blocking(move || verify_password_blocking(&password, &phc)).await?
}
