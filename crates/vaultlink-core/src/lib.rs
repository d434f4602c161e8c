//! # Vaultlink Core
//!
//! Share-link engine for Vaultlink.
//!
//! This crate provides:
//! - **File metadata**: upload, rename, delete, listing via [`FileService`]
//! - **Link issuance**: tokens, hashed passwords, expiry, one-time and E2EE
//!   policies via [`LinkIssuer`]
//! - **Access resolution**: the per-request state machine in [`LinkResolver`]
//!   with atomic one-time consumption
//! - **Share URLs**: composition and parsing of `.../share/{token}?iv=..&key=..`
//!
//! Persistence goes through the [`MetadataStore`] trait; bytes go through
//! [`vaultlink_store::ObjectStore`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use vaultlink_core::{LinkIssuer, LinkPolicy, LinkResolver, ResolveOutcome};
//!
//! let issued = issuer
//!     .issue_link("alice", &file.id, LinkPolicy::builder().one_time(true).build()?)
//!     .await?;
//!
//! match resolver.resolve(&issued.token, None).await? {
//!     ResolveOutcome::Granted(descriptor) => { /* preview */ }
//!     other => { /* refuse with other.status() */ }
//! }
//! ```

pub mod clock;
pub mod error;
pub mod files;
pub mod issuer;
pub mod link;
pub mod metadata;
pub mod resolver;
pub mod share_url;
pub mod store;
pub mod token;

pub use clock::{Clock, FixedClock, SharedClock, SystemClock};
pub use error::{CoreError, Result};
pub use files::{FileService, UploadRequest};
pub use issuer::{IssuedLink, LinkIssuer};
pub use link::{LinkPolicy, LinkPolicyBuilder, LinkStatus, LinkSummary, ShareLink};
pub use metadata::{EncryptionInfo, FileMetadata, Permission, StorageUsage};
pub use resolver::{ConfirmOutcome, ContentDescriptor, DownloadOutcome, LinkResolver, ResolveOutcome};
pub use share_url::ShareUrl;
pub use store::{ConsumeResult, MemoryMetadataStore, MetadataStore};
