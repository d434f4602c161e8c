//! # Vaultlink
//!
//! Encrypted file sharing with expiring, password-protected, and one-time
//! share links.
//!
//! The workspace is split by concern:
//!
//! - `vaultlink-crypto`: RSA-OAEP key pairs, AES-256-GCM envelope encryption,
//!   key stores, Argon2 password hashing
//! - `vaultlink-store`: object storage backends
//! - `vaultlink-core`: file metadata, link issuance, and the access state machine
//! - `vaultlink-cli`: the `vaultlink-gateway` HTTP server
//! - `vaultlink-client`: the client SDK that encrypts before upload
//!
//! This package only hosts the end-to-end tests under `tests/`.
