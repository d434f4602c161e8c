//! # Vaultlink Store
//!
//! Object storage for uploaded file content.
//!
//! Objects are opaque byte strings addressed by a locator such as
//! `{owner}/{uuid}`. For encrypted uploads the bytes are ciphertext; this
//! layer never sees keys.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          FileService / Resolver         │
//! ├─────────────────────────────────────────┤
//! │            ObjectStore Trait            │
//! ├────────────────────┬────────────────────┤
//! │   FsObjectStore    │ MemoryObjectStore  │
//! └────────────────────┴────────────────────┘
//! ```

pub mod error;
pub mod flexible;
pub mod fs;
pub mod memory;

pub use error::{Result, StoreError};
pub use flexible::FlexibleObjectStore;
pub use fs::FsObjectStore;
pub use memory::MemoryObjectStore;

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// Trait for object storage backends
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store an object, replacing any previous content at `key`
    async fn put(&self, key: &str, data: Bytes) -> Result<()>;

    /// Retrieve an object
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Check if an object exists
    async fn has(&self, key: &str) -> Result<bool>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Get object size without retrieving content
    async fn size(&self, key: &str) -> Result<u64>;

    /// Copy an object to a new key
    async fn copy(&self, from: &str, to: &str) -> Result<()> {
        let data = self.get(from).await?;
        self.put(to, data).await
    }
}

#[async_trait]
impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        (**self).put(key, data).await
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        (**self).get(key).await
    }

    async fn has(&self, key: &str) -> Result<bool> {
        (**self).has(key).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key).await
    }

    async fn size(&self, key: &str) -> Result<u64> {
        (**self).size(key).await
    }

    async fn copy(&self, from: &str, to: &str) -> Result<()> {
        (**self).copy(from, to).await
    }
}

/// Validate an object key: non-empty, relative, no `..` or empty segments
pub fn validate_key(key: &str) -> Result<()> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}
