//! Client-side envelope encryption glue
//!
//! Uploads are encrypted before they leave the process; only ciphertext,
//! the wrapped content key, and the nonce reach the gateway.

use crate::{ClientError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use vaultlink_core::{EncryptionInfo, ShareUrl};
use vaultlink_crypto::{EncryptedObject, EnvelopeDecryptor, PrivateKey};

pub(crate) const WRAPPED_KEY_HEADER: &str = "x-wrapped-key";
pub(crate) const NONCE_HEADER: &str = "x-nonce";

/// Headers announcing the key material of an encrypted upload
pub(crate) fn upload_headers(encrypted: &EncryptedObject) -> [(&'static str, String); 2] {
    [
        (WRAPPED_KEY_HEADER, STANDARD.encode(&encrypted.wrapped_key)),
        (NONCE_HEADER, encrypted.nonce.to_base64()),
    ]
}

/// Decrypt bytes downloaded through an E2EE share URL
///
/// The nonce and wrapped key come from the URL's `iv` and `key` parameters.
pub async fn decrypt_shared(
    share: &ShareUrl,
    ciphertext: Bytes,
    private_key: &PrivateKey,
) -> Result<Vec<u8>> {
    let encryption = share.encryption().ok_or_else(|| {
        ClientError::Config("share URL carries no key material".to_string())
    })?;
    decrypt_with(encryption, ciphertext, private_key).await
}

/// Decrypt downloaded ciphertext with the key material a granted share returned
pub async fn decrypt_with(
    encryption: &EncryptionInfo,
    ciphertext: Bytes,
    private_key: &PrivateKey,
) -> Result<Vec<u8>> {
    let object = EncryptedObject {
        ciphertext: ciphertext.to_vec(),
        nonce: encryption.nonce.clone(),
        wrapped_key: encryption.wrapped_key.clone(),
    };
    Ok(EnvelopeDecryptor::from_private_key(private_key)
        .decrypt(object)
        .await?)
}
