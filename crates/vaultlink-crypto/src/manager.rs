//! Per-principal key pair lifecycle

use crate::{
    keys::{KeyPair, PublicKey},
    keystore::{KeyStore, PublicKeyDirectory},
    CryptoError, Result,
};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument, warn};
use zeroize::Zeroizing;

/// Generates, persists and publishes principal key pairs
///
/// Key pairs are created once and never rotated: rotating would orphan every
/// content key already wrapped for the old public key.
pub struct KeyManager<S: KeyStore, D: PublicKeyDirectory> {
    store: S,
    directory: D,
    cache: RwLock<HashMap<String, KeyPair>>,
    /// Principals whose public key this manager has seen in the directory
    published: RwLock<HashSet<String>>,
    creation: tokio::sync::Mutex<()>,
}

impl<S: KeyStore, D: PublicKeyDirectory> KeyManager<S, D> {
    /// Create a manager over a key store and a public key directory
    pub fn new(store: S, directory: D) -> Self {
        Self {
            store,
            directory,
            cache: RwLock::new(HashMap::new()),
            published: RwLock::new(HashSet::new()),
            creation: tokio::sync::Mutex::new(()),
        }
    }

    /// Return the principal's key pair, generating and registering it on first use
    ///
    /// A key pair loaded from the store is republished if the directory has
    /// lost it.
    #[instrument(skip(self))]
    pub async fn get_or_create_key_pair(&self, principal: &str) -> Result<KeyPair> {
        if let Some(kp) = self.cached(principal) {
            if self.published.read().contains(principal) {
                return Ok(kp);
            }
        }

        let _guard = self.creation.lock().await;
        if let Some(kp) = self.key_pair(principal).await? {
            self.ensure_published(principal, &kp).await?;
            return Ok(kp);
        }

        let generated = tokio::task::spawn_blocking(KeyPair::generate).await??;

        match self.store.store(principal, generated.private_key()).await {
            Ok(()) => {}
            Err(CryptoError::KeyAlreadyExists(_)) => {
                // Another process created it first; use theirs
                let kp = self
                    .key_pair(principal)
                    .await?
                    .ok_or_else(|| CryptoError::KeyStore(format!("key for {} vanished", principal)))?;
                self.ensure_published(principal, &kp).await?;
                return Ok(kp);
            }
            Err(e) => return Err(e),
        }

        if let Err(e) = self.directory.register(principal, generated.public_key()).await {
            warn!(error = %e, "Public key registration failed, discarding new key pair");
            self.store.remove(principal).await?;
            return Err(e);
        }

        info!("Created key pair");
        self.cache
            .write()
            .insert(principal.to_string(), generated.clone());
        self.published.write().insert(principal.to_string());
        Ok(generated)
    }

    /// Register a stored key pair whose public half is missing from the directory
    async fn ensure_published(&self, principal: &str, kp: &KeyPair) -> Result<()> {
        if self.published.read().contains(principal) {
            return Ok(());
        }
        match self.directory.lookup(principal).await? {
            Some(existing) if &existing == kp.public_key() => {}
            Some(_) => {
                return Err(CryptoError::KeyAlreadyExists(format!(
                    "directory holds a different public key for {}",
                    principal
                )))
            }
            None => {
                self.directory.register(principal, kp.public_key()).await?;
                info!("Republished public key");
            }
        }
        self.published.write().insert(principal.to_string());
        Ok(())
    }

    /// Load an existing key pair without creating one
    pub async fn key_pair(&self, principal: &str) -> Result<Option<KeyPair>> {
        if let Some(kp) = self.cached(principal) {
            return Ok(Some(kp));
        }
        let Some(private) = self.store.load(principal).await? else {
            return Ok(None);
        };
        let kp = KeyPair::from_private_key(private);
        self.cache.write().insert(principal.to_string(), kp.clone());
        Ok(Some(kp))
    }

    /// Fetch another principal's published public key
    pub async fn public_key_for(&self, principal: &str) -> Result<PublicKey> {
        self.directory
            .lookup(principal)
            .await?
            .ok_or_else(|| CryptoError::PublicKeyNotFound(principal.to_string()))
    }

    /// Export the principal's private key as PKCS#8 PEM
    pub async fn export_private_key_pem(&self, principal: &str) -> Result<Zeroizing<String>> {
        let kp = self
            .key_pair(principal)
            .await?
            .ok_or_else(|| CryptoError::KeyStore(format!("no private key for {}", principal)))?;
        kp.private_key().to_pkcs8_pem()
    }

    /// The underlying key store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The underlying directory
    pub fn directory(&self) -> &D {
        &self.directory
    }

    fn cached(&self, principal: &str) -> Option<KeyPair> {
        self.cache.read().get(principal).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::{MemoryKeyDirectory, MemoryKeyStore};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct RejectingDirectory;

    #[async_trait]
    impl PublicKeyDirectory for RejectingDirectory {
        async fn register(&self, _principal: &str, _key: &PublicKey) -> Result<()> {
            Err(CryptoError::Directory("unavailable".into()))
        }

        async fn lookup(&self, _principal: &str) -> Result<Option<PublicKey>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let directory = MemoryKeyDirectory::new();
        let manager = KeyManager::new(MemoryKeyStore::new(), directory.clone());

        let first = manager.get_or_create_key_pair("alice").await.unwrap();
        let second = manager.get_or_create_key_pair("alice").await.unwrap();
        assert_eq!(first.public_key(), second.public_key());

        let published = directory.lookup("alice").await.unwrap().unwrap();
        assert_eq!(&published, first.public_key());
        assert_eq!(&manager.public_key_for("alice").await.unwrap(), first.public_key());
    }

    #[tokio::test]
    async fn test_existing_key_is_not_rotated() {
        let store = MemoryKeyStore::new();
        let first = KeyManager::new(store.clone(), MemoryKeyDirectory::new())
            .get_or_create_key_pair("alice")
            .await
            .unwrap();

        // A fresh manager over the same store sees the same key
        let again = KeyManager::new(store, MemoryKeyDirectory::new())
            .get_or_create_key_pair("alice")
            .await
            .unwrap();
        assert_eq!(first.public_key(), again.public_key());
    }

    #[tokio::test]
    async fn test_stored_key_is_republished_to_empty_directory() {
        let store = MemoryKeyStore::new();
        let created = KeyManager::new(store.clone(), MemoryKeyDirectory::new())
            .get_or_create_key_pair("alice")
            .await
            .unwrap();

        // Directory restarted empty; the stored key must come back
        let directory = MemoryKeyDirectory::new();
        let manager = KeyManager::new(store, directory.clone());
        manager.get_or_create_key_pair("alice").await.unwrap();

        let published = directory.lookup("alice").await.unwrap().unwrap();
        assert_eq!(&published, created.public_key());
    }

    #[tokio::test]
    async fn test_conflicting_directory_key_is_reported() {
        let store = MemoryKeyStore::new();
        let directory = MemoryKeyDirectory::new();
        let other = crate::keys::tests::test_keypair();
        directory.register("alice", other.public_key()).await.unwrap();

        KeyManager::new(store.clone(), MemoryKeyDirectory::new())
            .get_or_create_key_pair("alice")
            .await
            .unwrap();
        let err = KeyManager::new(store, directory)
            .get_or_create_key_pair("alice")
            .await
            .unwrap_err();
        assert!(matches!(err, CryptoError::KeyAlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_failed_registration_leaves_no_key() {
        let store = MemoryKeyStore::new();
        let manager = KeyManager::new(store.clone(), RejectingDirectory);

        let err = manager.get_or_create_key_pair("alice").await.unwrap_err();
        assert!(matches!(err, CryptoError::Directory(_)));
        assert!(store.is_empty());
        assert!(manager.key_pair("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_creation_yields_one_key() {
        let manager = Arc::new(KeyManager::new(MemoryKeyStore::new(), MemoryKeyDirectory::new()));

        let a = tokio::spawn({
            let m = manager.clone();
            async move { m.get_or_create_key_pair("alice").await }
        });
        let b = tokio::spawn({
            let m = manager.clone();
            async move { m.get_or_create_key_pair("alice").await }
        });

        let a = a.await.unwrap().unwrap();
        let b = b.await.unwrap().unwrap();
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(manager.store().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_recipient() {
        let manager = KeyManager::new(MemoryKeyStore::new(), MemoryKeyDirectory::new());
        let err = manager.public_key_for("nobody").await.unwrap_err();
        assert!(matches!(err, CryptoError::PublicKeyNotFound(_)));
    }

    #[tokio::test]
    async fn test_export_pem() {
        let manager = KeyManager::new(MemoryKeyStore::new(), MemoryKeyDirectory::new());
        manager.get_or_create_key_pair("alice").await.unwrap();
        let pem = manager.export_private_key_pem("alice").await.unwrap();
        assert!(pem.contains("BEGIN PRIVATE KEY"));
    }
}
