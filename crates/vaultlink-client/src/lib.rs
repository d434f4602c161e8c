//! # Vaultlink Client SDK
//!
//! Runs key management and envelope encryption on the principal's side and
//! talks to a Vaultlink gateway.
//!
//! ## Example
//!
//! ```rust,ignore
//! use vaultlink_client::{Config, ShareOptions, VaultClient};
//! use vaultlink_core::Permission;
//! use vaultlink_crypto::FileKeyStore;
//!
//! let client = VaultClient::new(
//!     Config::new("https://vault.example").with_token(jwt),
//!     "alice",
//!     FileKeyStore::open("~/.vaultlink/keys").await?,
//! )?;
//!
//! let file = client.upload("report.pdf", None, bytes, true).await?;
//! let link = client
//!     .issue_link(&file.id, &ShareOptions::new(Permission::Download).one_time().e2ee())
//!     .await?;
//!
//! // Recipient side
//! let plain = recipient
//!     .download_and_decrypt(&link.url, None, keypair.private_key())
//!     .await?;
//! ```

mod client;
mod config;
mod directory;
mod encryption;
mod error;
mod transport;
mod types;

pub use client::VaultClient;
pub use config::Config;
pub use directory::HttpKeyDirectory;
pub use encryption::{decrypt_shared, decrypt_with};
pub use error::{ClientError, Result};
pub use types::*;
