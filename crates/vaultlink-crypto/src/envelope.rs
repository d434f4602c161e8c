//! Envelope encryption
//!
//! Each object is sealed under a fresh 256-bit content key and a fresh 96-bit
//! nonce with AES-256-GCM; the content key is then wrapped with the
//! recipient's RSA-OAEP public key and discarded. The three outputs
//! (ciphertext with trailing tag, wrapped key, nonce) travel together.
//!
//! The `encrypt`/`decrypt` methods run on the blocking pool and are the
//! suspend points callers should use; the `*_blocking` variants exist for
//! code that is already off the async executor.

use crate::{
    keys::{ContentKey, KeyPair, PrivateKey, PublicKey, KEY_SIZE, TAG_SIZE},
    symmetric::{Aead, Nonce},
    CryptoError, Result,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Output of envelope encryption
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedObject {
    /// AES-GCM ciphertext with the 16-byte tag appended
    #[serde(with = "base64_vec_serde")]
    pub ciphertext: Vec<u8>,
    /// The nonce used for AES-GCM
    pub nonce: Nonce,
    /// The content key wrapped under the recipient's public key
    #[serde(with = "base64_vec_serde")]
    pub wrapped_key: Vec<u8>,
}

impl EncryptedObject {
    /// Length of the plaintext this object decrypts to
    pub fn plaintext_len(&self) -> usize {
        self.ciphertext.len().saturating_sub(TAG_SIZE)
    }
}

/// Serde adapter for `Vec<u8>` fields carried as standard base64 strings
pub mod base64_vec_serde {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        base64::engine::general_purpose::STANDARD
            .decode(&s)
            .map_err(serde::de::Error::custom)
    }
}

/// Encrypts content for a single recipient public key
#[derive(Clone, Debug)]
pub struct EnvelopeEncryptor {
    recipient: PublicKey,
}

impl EnvelopeEncryptor {
    /// Create an encryptor for the given recipient
    pub fn new(recipient: &PublicKey) -> Self {
        Self {
            recipient: recipient.clone(),
        }
    }

    /// Encrypt on the blocking pool
    pub async fn encrypt(&self, plaintext: impl Into<Bytes>) -> Result<EncryptedObject> {
        let plaintext = plaintext.into();
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.encrypt_blocking(&plaintext)).await?
    }

    /// Encrypt on the current thread
    pub fn encrypt_blocking(&self, plaintext: &[u8]) -> Result<EncryptedObject> {
        let key = ContentKey::generate();
        let nonce = Nonce::generate();

        let ciphertext = Aead::new(&key).encrypt(&nonce, plaintext)?;
        let wrapped_key = self.recipient.wrap_key(&key)?;
        // `key` is zeroized when it drops here

        Ok(EncryptedObject {
            ciphertext,
            nonce,
            wrapped_key,
        })
    }
}

/// Decrypts envelopes with the recipient's private key
///
/// This is the only component that touches private key material or an
/// unwrapped content key, and it never hands either out.
#[derive(Clone)]
pub struct EnvelopeDecryptor {
    private: PrivateKey,
}

impl EnvelopeDecryptor {
    /// Create a decryptor from the recipient's key pair
    pub fn new(keypair: &KeyPair) -> Self {
        Self::from_private_key(keypair.private_key())
    }

    /// Create a decryptor from a private key
    pub fn from_private_key(private: &PrivateKey) -> Self {
        Self {
            private: private.clone(),
        }
    }

    /// Decrypt on the blocking pool
    pub async fn decrypt(&self, encrypted: EncryptedObject) -> Result<Vec<u8>> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.decrypt_blocking(&encrypted)).await?
    }

    /// Decrypt on the current thread
    pub fn decrypt_blocking(&self, encrypted: &EncryptedObject) -> Result<Vec<u8>> {
        self.open(&encrypted.ciphertext, &encrypted.nonce, &encrypted.wrapped_key)
    }

    /// Decrypt from loose parts, e.g. a downloaded blob plus the `iv`/`key`
    /// carried in a share URL
    pub fn open(&self, ciphertext: &[u8], nonce: &Nonce, wrapped_key: &[u8]) -> Result<Vec<u8>> {
        let unwrapped = self.private.unwrap_key(wrapped_key)?;
        if unwrapped.len() != KEY_SIZE {
            return Err(CryptoError::KeyLengthMismatch {
                expected: KEY_SIZE,
                actual: unwrapped.len(),
            });
        }
        let key = ContentKey::from_bytes(&unwrapped)?;
        Aead::new(&key).decrypt(nonce, ciphertext)
    }
}
