//! Storage for key material
//!
//! A [`KeyStore`] holds private keys inside the principal's own trust
//! boundary. A [`PublicKeyDirectory`] is where public halves are published so
//! others can encrypt for the principal. Both are injected into
//! [`crate::KeyManager`]; nothing here is a process-wide singleton.

use crate::{
    keys::{PrivateKey, PublicKey},
    CryptoError, Result,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use zeroize::Zeroizing;

/// Private key persistence scoped to a principal
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Load the principal's private key, if one exists
    async fn load(&self, principal: &str) -> Result<Option<PrivateKey>>;

    /// Persist a private key. Fails with `KeyAlreadyExists` rather than
    /// overwriting an existing key.
    async fn store(&self, principal: &str, key: &PrivateKey) -> Result<()>;

    /// Remove the principal's private key. Removing a missing key is not an error.
    async fn remove(&self, principal: &str) -> Result<()>;
}

/// Registry of published public keys
#[async_trait]
pub trait PublicKeyDirectory: Send + Sync {
    /// Publish the principal's public key
    async fn register(&self, principal: &str, key: &PublicKey) -> Result<()>;

    /// Look up a principal's public key
    async fn lookup(&self, principal: &str) -> Result<Option<PublicKey>>;
}

#[async_trait]
impl<T: KeyStore + ?Sized> KeyStore for Arc<T> {
    async fn load(&self, principal: &str) -> Result<Option<PrivateKey>> {
        (**self).load(principal).await
    }

    async fn store(&self, principal: &str, key: &PrivateKey) -> Result<()> {
        (**self).store(principal, key).await
    }

    async fn remove(&self, principal: &str) -> Result<()> {
        (**self).remove(principal).await
    }
}

#[async_trait]
impl<T: PublicKeyDirectory + ?Sized> PublicKeyDirectory for Arc<T> {
    async fn register(&self, principal: &str, key: &PublicKey) -> Result<()> {
        (**self).register(principal, key).await
    }

    async fn lookup(&self, principal: &str) -> Result<Option<PublicKey>> {
        (**self).lookup(principal).await
    }
}

/// In-memory key store holding PKCS#8 DER
#[derive(Clone, Default)]
pub struct MemoryKeyStore {
    keys: Arc<RwLock<HashMap<String, Zeroizing<Vec<u8>>>>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of principals with a stored key
    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn load(&self, principal: &str) -> Result<Option<PrivateKey>> {
        let guard = self.keys.read();
        guard
            .get(principal)
            .map(|der| PrivateKey::from_pkcs8_der(der))
            .transpose()
    }

    async fn store(&self, principal: &str, key: &PrivateKey) -> Result<()> {
        let der = key.to_pkcs8_der()?;
        let mut guard = self.keys.write();
        if guard.contains_key(principal) {
            return Err(CryptoError::KeyAlreadyExists(principal.to_string()));
        }
        guard.insert(principal.to_string(), der);
        Ok(())
    }

    async fn remove(&self, principal: &str) -> Result<()> {
        self.keys.write().remove(principal);
        Ok(())
    }
}

/// Filesystem key store: one PKCS#8 PEM file per principal
///
/// File names are the BLAKE3 hash of the principal id so arbitrary ids never
/// become path components.
#[derive(Clone, Debug)]
pub struct FileKeyStore {
    root: PathBuf,
}

impl FileKeyStore {
    /// Open a key store rooted at `root`, creating the directory if needed
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn path_for(&self, principal: &str) -> PathBuf {
        let name = blake3::hash(principal.as_bytes()).to_hex();
        self.root.join(format!("{}.pem", name))
    }
}

#[async_trait]
impl KeyStore for FileKeyStore {
    async fn load(&self, principal: &str) -> Result<Option<PrivateKey>> {
        match tokio::fs::read_to_string(self.path_for(principal)).await {
            Ok(pem) => {
                let pem = Zeroizing::new(pem);
                PrivateKey::from_pkcs8_pem(&pem).map(Some)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CryptoError::KeyStore(e.to_string())),
        }
    }

    async fn store(&self, principal: &str, key: &PrivateKey) -> Result<()> {
        let path = self.path_for(principal);
        let pem = key.to_pkcs8_pem()?;

        let mut opts = tokio::fs::OpenOptions::new();
        opts.write(true).create_new(true);
        #[cfg(unix)]
        opts.mode(0o600);

        let mut file = match opts.open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(CryptoError::KeyAlreadyExists(principal.to_string()));
            }
            Err(e) => return Err(CryptoError::KeyStore(e.to_string())),
        };
        file.write_all(pem.as_bytes()).await?;
        file.sync_all().await?;

        debug!(path = %path.display(), "Stored private key");
        Ok(())
    }

    async fn remove(&self, principal: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(principal)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CryptoError::KeyStore(e.to_string())),
        }
    }
}

/// In-memory public key directory
#[derive(Clone, Default)]
pub struct MemoryKeyDirectory {
    keys: Arc<RwLock<HashMap<String, PublicKey>>>,
}

impl MemoryKeyDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PublicKeyDirectory for MemoryKeyDirectory {
    async fn register(&self, principal: &str, key: &PublicKey) -> Result<()> {
        self.keys.write().insert(principal.to_string(), key.clone());
        Ok(())
    }

    async fn lookup(&self, principal: &str) -> Result<Option<PublicKey>> {
        Ok(self.keys.read().get(principal).cloned())
    }
}
