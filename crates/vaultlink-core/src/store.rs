//! Persistence for file metadata and share links

use crate::{
    link::ShareLink,
    metadata::{FileMetadata, Permission},
    CoreError, Result,
};
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::Arc;
use uuid::Uuid;

/// Result of a one-time consumption attempt
#[derive(Clone, Debug, PartialEq)]
pub enum ConsumeResult {
    /// This call flipped `used` to true; carries the updated record
    Consumed(ShareLink),
    /// The grant was already used
    AlreadyUsed,
    /// The link is not a one-time link
    NotOneTime,
    /// No link with this token
    NotFound,
}

/// Document persistence for files and links
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert new file metadata
    async fn insert_file(&self, file: FileMetadata) -> Result<()>;

    /// Get file metadata by id
    async fn get_file(&self, id: &Uuid) -> Result<Option<FileMetadata>>;

    /// Replace existing file metadata
    async fn update_file(&self, file: FileMetadata) -> Result<()>;

    /// Remove file metadata, returning it if it existed
    async fn delete_file(&self, id: &Uuid) -> Result<Option<FileMetadata>>;

    /// All files owned by a principal
    async fn list_files(&self, owner: &str) -> Result<Vec<FileMetadata>>;

    /// Insert a new link. Fails with `TokenCollision` if the token exists.
    async fn insert_link(&self, link: ShareLink) -> Result<()>;

    /// Look up a link by token
    async fn get_link(&self, token: &str) -> Result<Option<ShareLink>>;

    /// Remove a link, returning it if it existed
    async fn delete_link(&self, token: &str) -> Result<Option<ShareLink>>;

    /// All links issued by a principal
    async fn list_links(&self, owner: &str) -> Result<Vec<ShareLink>>;

    /// Remove every link pointing at a file; returns how many were removed
    async fn delete_links_for_file(&self, file_id: &Uuid) -> Result<usize>;

    /// Atomically consume a one-time grant
    ///
    /// Must behave as a single conditional update keyed on `used == false`:
    /// set `used = true` and downgrade `permissions` to `ViewOnly`. Of any
    /// number of concurrent callers at most one observes `Consumed`.
    async fn consume_one_time(&self, token: &str) -> Result<ConsumeResult>;
}

#[async_trait]
impl<T: MetadataStore + ?Sized> MetadataStore for Arc<T> {
    async fn insert_file(&self, file: FileMetadata) -> Result<()> {
        (**self).insert_file(file).await
    }

    async fn get_file(&self, id: &Uuid) -> Result<Option<FileMetadata>> {
        (**self).get_file(id).await
    }

    async fn update_file(&self, file: FileMetadata) -> Result<()> {
        (**self).update_file(file).await
    }

    async fn delete_file(&self, id: &Uuid) -> Result<Option<FileMetadata>> {
        (**self).delete_file(id).await
    }

    async fn list_files(&self, owner: &str) -> Result<Vec<FileMetadata>> {
        (**self).list_files(owner).await
    }

    async fn insert_link(&self, link: ShareLink) -> Result<()> {
        (**self).insert_link(link).await
    }

    async fn get_link(&self, token: &str) -> Result<Option<ShareLink>> {
        (**self).get_link(token).await
    }

    async fn delete_link(&self, token: &str) -> Result<Option<ShareLink>> {
        (**self).delete_link(token).await
    }

    async fn list_links(&self, owner: &str) -> Result<Vec<ShareLink>> {
        (**self).list_links(owner).await
    }

    async fn delete_links_for_file(&self, file_id: &Uuid) -> Result<usize> {
        (**self).delete_links_for_file(file_id).await
    }

    async fn consume_one_time(&self, token: &str) -> Result<ConsumeResult> {
        (**self).consume_one_time(token).await
    }
}

/// In-memory metadata store
///
/// Each link lives in its own DashMap shard entry; the one-time CAS runs
/// while holding that entry's write lock.
#[derive(Clone, Default)]
pub struct MemoryMetadataStore {
    files: Arc<DashMap<Uuid, FileMetadata>>,
    links: Arc<DashMap<String, ShareLink>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn insert_file(&self, file: FileMetadata) -> Result<()> {
        match self.files.entry(file.id) {
            Entry::Occupied(_) => Err(CoreError::Persistence(format!(
                "file {} already exists",
                file.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(file);
                Ok(())
            }
        }
    }

    async fn get_file(&self, id: &Uuid) -> Result<Option<FileMetadata>> {
        Ok(self.files.get(id).map(|entry| entry.value().clone()))
    }

    async fn update_file(&self, file: FileMetadata) -> Result<()> {
        match self.files.get_mut(&file.id) {
            Some(mut entry) => {
                *entry = file;
                Ok(())
            }
            None => Err(CoreError::FileNotFound(file.id.to_string())),
        }
    }

    async fn delete_file(&self, id: &Uuid) -> Result<Option<FileMetadata>> {
        Ok(self.files.remove(id).map(|(_, file)| file))
    }

    async fn list_files(&self, owner: &str) -> Result<Vec<FileMetadata>> {
        Ok(self
            .files
            .iter()
            .filter(|entry| entry.owner == owner)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn insert_link(&self, link: ShareLink) -> Result<()> {
        match self.links.entry(link.token.clone()) {
            Entry::Occupied(_) => Err(CoreError::TokenCollision),
            Entry::Vacant(slot) => {
                slot.insert(link);
                Ok(())
            }
        }
    }

    async fn get_link(&self, token: &str) -> Result<Option<ShareLink>> {
        Ok(self.links.get(token).map(|entry| entry.value().clone()))
    }

    async fn delete_link(&self, token: &str) -> Result<Option<ShareLink>> {
        Ok(self.links.remove(token).map(|(_, link)| link))
    }

    async fn list_links(&self, owner: &str) -> Result<Vec<ShareLink>> {
        Ok(self
            .links
            .iter()
            .filter(|entry| entry.owner == owner)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn delete_links_for_file(&self, file_id: &Uuid) -> Result<usize> {
        let before = self.links.len();
        self.links.retain(|_, link| link.file_id != *file_id);
        Ok(before.saturating_sub(self.links.len()))
    }

    async fn consume_one_time(&self, token: &str) -> Result<ConsumeResult> {
        let Some(mut entry) = self.links.get_mut(token) else {
            return Ok(ConsumeResult::NotFound);
        };
        let link = entry.value_mut();
        if !link.is_one_time_download {
            return Ok(ConsumeResult::NotOneTime);
        }
        if link.used {
            return Ok(ConsumeResult::AlreadyUsed);
        }
        link.used = true;
        link.permissions = Permission::ViewOnly;
        Ok(ConsumeResult::Consumed(link.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn one_time_link(token: &str) -> ShareLink {
        ShareLink {
            token: token.to_string(),
            file_id: Uuid::new_v4(),
            owner: "alice".into(),
            password_hash: None,
            expires_at: None,
            is_one_time_download: true,
            used: false,
            permissions: Permission::Download,
            is_e2ee: false,
            encryption: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_link_collision() {
        let store = MemoryMetadataStore::new();
        store.insert_link(one_time_link("tok")).await.unwrap();
        let err = store.insert_link(one_time_link("tok")).await.unwrap_err();
        assert!(matches!(err, CoreError::TokenCollision));
    }

    #[tokio::test]
    async fn test_consume_flips_once() {
        let store = MemoryMetadataStore::new();
        store.insert_link(one_time_link("tok")).await.unwrap();

        match store.consume_one_time("tok").await.unwrap() {
            ConsumeResult::Consumed(link) => {
                assert!(link.used);
                assert_eq!(link.permissions, Permission::ViewOnly);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            store.consume_one_time("tok").await.unwrap(),
            ConsumeResult::AlreadyUsed
        );
        // The record stays, downgraded
        let stored = store.get_link("tok").await.unwrap().unwrap();
        assert!(stored.used);
        assert_eq!(stored.permissions, Permission::ViewOnly);
    }

    #[tokio::test]
    async fn test_consume_not_one_time_and_missing() {
        let store = MemoryMetadataStore::new();
        let mut link = one_time_link("multi");
        link.is_one_time_download = false;
        store.insert_link(link).await.unwrap();

        assert_eq!(
            store.consume_one_time("multi").await.unwrap(),
            ConsumeResult::NotOneTime
        );
        assert_eq!(
            store.consume_one_time("nope").await.unwrap(),
            ConsumeResult::NotFound
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_consume_has_single_winner() {
        let store = MemoryMetadataStore::new();
        store.insert_link(one_time_link("race")).await.unwrap();

        let tasks: Vec<_> = (0..64)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.consume_one_time("race").await.unwrap() })
            })
            .collect();

        let mut winners = 0;
        for task in tasks {
            if matches!(task.await.unwrap(), ConsumeResult::Consumed(_)) {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_delete_links_for_file() {
        let store = MemoryMetadataStore::new();
        let a = one_time_link("a");
        let mut b = one_time_link("b");
        b.file_id = a.file_id;
        let c = one_time_link("c");
        let file_id = a.file_id;
        store.insert_link(a).await.unwrap();
        store.insert_link(b).await.unwrap();
        store.insert_link(c).await.unwrap();

        assert_eq!(store.delete_links_for_file(&file_id).await.unwrap(), 2);
        assert_eq!(store.link_count(), 1);
    }
}
