//! Backend selection at startup

use crate::{FsObjectStore, MemoryObjectStore, ObjectStore, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use tracing::{info, warn};

/// Object store that uses the filesystem when a root is configured,
/// or falls back to memory storage
#[derive(Clone, Debug)]
pub enum FlexibleObjectStore {
    /// Local filesystem
    Fs(FsObjectStore),
    /// In-memory storage (fallback)
    Memory(MemoryObjectStore),
}

impl FlexibleObjectStore {
    /// Open the filesystem backend at `root`, or use memory if `root` is `None`
    /// or cannot be opened
    pub async fn open_or_memory(root: Option<&Path>) -> Self {
        let Some(root) = root else {
            info!("No storage root configured, using in-memory object store");
            return Self::Memory(MemoryObjectStore::new());
        };
        match FsObjectStore::open(root).await {
            Ok(store) => {
                info!(root = %root.display(), "Using filesystem object store");
                Self::Fs(store)
            }
            Err(e) => {
                warn!(error = %e, root = %root.display(), "Failed to open storage root, using in-memory storage");
                Self::Memory(MemoryObjectStore::new())
            }
        }
    }

    /// Check if using durable storage or the memory fallback
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Fs(_))
    }
}

#[async_trait]
impl ObjectStore for FlexibleObjectStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        match self {
            Self::Fs(store) => store.put(key, data).await,
            Self::Memory(store) => store.put(key, data).await,
        }
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        match self {
            Self::Fs(store) => store.get(key).await,
            Self::Memory(store) => store.get(key).await,
        }
    }

    async fn has(&self, key: &str) -> Result<bool> {
        match self {
            Self::Fs(store) => store.has(key).await,
            Self::Memory(store) => store.has(key).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match self {
            Self::Fs(store) => store.delete(key).await,
            Self::Memory(store) => store.delete(key).await,
        }
    }

    async fn size(&self, key: &str) -> Result<u64> {
        match self {
            Self::Fs(store) => store.size(key).await,
            Self::Memory(store) => store.size(key).await,
        }
    }

    async fn copy(&self, from: &str, to: &str) -> Result<()> {
        match self {
            Self::Fs(store) => store.copy(from, to).await,
            Self::Memory(store) => store.copy(from, to).await,
        }
    }
}
