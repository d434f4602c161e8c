//! # Vaultlink Crypto
//!
//! Client-side cryptography for Vaultlink share links.
//!
//! This crate provides:
//! - **Envelope encryption**: AES-256-GCM content encryption with a fresh key
//!   and nonce per object, the key wrapped with RSA-OAEP (2048-bit, SHA-256)
//! - **Key management**: one key pair per principal, stored through an
//!   injected [`KeyStore`] and published through a [`PublicKeyDirectory`]
//! - **Password hashing**: Argon2id PHC strings for link passwords
//!
//! ## Security Model
//!
//! - Encryption and decryption happen in the principal's own process
//! - Private keys and unwrapped content keys never leave the decryptor
//! - The server only ever sees ciphertext, wrapped keys and nonces
//!
//! ## Example
//!
//! ```rust,ignore
//! use vaultlink_crypto::{EnvelopeDecryptor, EnvelopeEncryptor, KeyManager};
//!
//! let keypair = manager.get_or_create_key_pair("alice").await?;
//!
//! let encrypted = EnvelopeEncryptor::new(keypair.public_key())
//!     .encrypt(b"Hello, World!".to_vec())
//!     .await?;
//!
//! let plaintext = EnvelopeDecryptor::new(&keypair)
//!     .decrypt(encrypted)
//!     .await?;
//! ```

pub mod envelope;
pub mod error;
pub mod hashing;
pub mod keys;
pub mod keystore;
pub mod manager;
pub mod password;
pub mod symmetric;

pub use envelope::{EncryptedObject, EnvelopeDecryptor, EnvelopeEncryptor};
pub use error::{CryptoError, Result};
pub use keys::{ContentKey, KeyPair, PrivateKey, PublicKey, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use keystore::{FileKeyStore, KeyStore, MemoryKeyDirectory, MemoryKeyStore, PublicKeyDirectory};
pub use manager::KeyManager;
pub use password::{hash_password, verify_password};
pub use symmetric::{Aead, Nonce};
