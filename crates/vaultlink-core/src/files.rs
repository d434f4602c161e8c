//! File lifecycle: upload, rename, delete, listing

use crate::{
    clock::{system_clock, SharedClock},
    metadata::{new_storage_locator, validate_filename, EncryptionInfo, FileMetadata, StorageUsage},
    store::MetadataStore,
    CoreError, Result,
};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use vaultlink_store::{ObjectStore, StoreError};

/// An upload as received from the client
///
/// For encrypted uploads `data` is already ciphertext and `encryption`
/// carries the wrapped key and nonce produced alongside it.
#[derive(Clone, Debug)]
pub struct UploadRequest {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
    pub encryption: Option<EncryptionInfo>,
}

/// Manages file metadata against the object and metadata stores
pub struct FileService<O: ObjectStore, M: MetadataStore> {
    objects: Arc<O>,
    metadata: Arc<M>,
    clock: SharedClock,
}

impl<O: ObjectStore, M: MetadataStore> Clone for FileService<O, M> {
    fn clone(&self) -> Self {
        Self {
            objects: Arc::clone(&self.objects),
            metadata: Arc::clone(&self.metadata),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<O: ObjectStore, M: MetadataStore> FileService<O, M> {
    pub fn new(objects: Arc<O>, metadata: Arc<M>) -> Self {
        Self::with_clock(objects, metadata, system_clock())
    }

    pub fn with_clock(objects: Arc<O>, metadata: Arc<M>, clock: SharedClock) -> Self {
        Self {
            objects,
            metadata,
            clock,
        }
    }

    /// Store the bytes, then record metadata
    ///
    /// If the metadata write fails the stored object is removed again.
    #[instrument(skip(self, request), fields(filename = %request.filename, size = request.data.len()))]
    pub async fn upload(&self, owner: &str, request: UploadRequest) -> Result<FileMetadata> {
        validate_filename(&request.filename).map_err(CoreError::InvalidInput)?;
        if let Some(enc) = &request.encryption {
            if enc.wrapped_key.is_empty() {
                return Err(CoreError::InvalidInput("wrapped key must not be empty".into()));
            }
        }

        let locator = new_storage_locator(owner);
        let checksum = vaultlink_crypto::hashing::checksum(&request.data);
        let size = request.data.len() as u64;

        self.objects.put(&locator, request.data).await?;

        let now = self.clock.now();
        let file = FileMetadata {
            id: Uuid::new_v4(),
            owner: owner.to_string(),
            storage_locator: locator.clone(),
            filename: request.filename.trim().to_string(),
            size,
            content_type: request.content_type,
            checksum,
            encryption: request.encryption,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.metadata.insert_file(file.clone()).await {
            warn!(error = %e, "Metadata write failed, removing stored object");
            if let Err(cleanup) = self.objects.delete(&locator).await {
                warn!(error = %cleanup, locator = %locator, "Failed to remove orphaned object");
            }
            return Err(e);
        }

        info!(file_id = %file.id, encrypted = file.is_encrypted(), "File uploaded");
        Ok(file)
    }

    /// Get a file owned by `owner`
    pub async fn get(&self, owner: &str, file_id: &Uuid) -> Result<FileMetadata> {
        match self.metadata.get_file(file_id).await? {
            Some(file) if file.is_owned_by(owner) => Ok(file),
            _ => Err(CoreError::FileNotFound(file_id.to_string())),
        }
    }

    /// All files owned by `owner`, newest first
    pub async fn list(&self, owner: &str) -> Result<Vec<FileMetadata>> {
        let mut files = self.metadata.list_files(owner).await?;
        files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(files)
    }

    /// File count and stored bytes for `owner`
    pub async fn usage(&self, owner: &str) -> Result<StorageUsage> {
        let files = self.metadata.list_files(owner).await?;
        Ok(StorageUsage {
            file_count: files.len() as u64,
            total_bytes: files.iter().map(|f| f.size).sum(),
        })
    }

    /// Rename a file, moving its object to a fresh locator
    #[instrument(skip(self))]
    pub async fn rename(&self, owner: &str, file_id: &Uuid, new_name: &str) -> Result<FileMetadata> {
        validate_filename(new_name).map_err(CoreError::InvalidInput)?;
        let mut file = self.get(owner, file_id).await?;

        let old_locator = file.storage_locator.clone();
        let new_locator = new_storage_locator(owner);
        self.objects.copy(&old_locator, &new_locator).await?;

        file.filename = new_name.trim().to_string();
        file.storage_locator = new_locator.clone();
        file.updated_at = self.clock.now();

        if let Err(e) = self.metadata.update_file(file.clone()).await {
            warn!(error = %e, "Metadata update failed, removing relocated object");
            if let Err(cleanup) = self.objects.delete(&new_locator).await {
                warn!(error = %cleanup, locator = %new_locator, "Failed to remove relocated object");
            }
            return Err(e);
        }
        if let Err(e) = self.objects.delete(&old_locator).await {
            warn!(error = %e, locator = %old_locator, "Failed to remove old object after rename");
        }

        info!("File renamed");
        Ok(file)
    }

    /// Delete a file, its object, and every link pointing at it
    ///
    /// The object goes first so a storage failure leaves the file listed
    /// and the delete can be retried. An object that is already gone is
    /// not an error.
    #[instrument(skip(self))]
    pub async fn delete(&self, owner: &str, file_id: &Uuid) -> Result<()> {
        let file = self.get(owner, file_id).await?;

        match self.objects.delete(&file.storage_locator).await {
            Ok(()) | Err(StoreError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
        let removed_links = self.metadata.delete_links_for_file(file_id).await?;
        self.metadata.delete_file(file_id).await?;

        info!(removed_links, "File deleted");
        Ok(())
    }

    /// Read stored bytes by locator
    pub async fn read_content(&self, storage_locator: &str) -> Result<Bytes> {
        Ok(self.objects.get(storage_locator).await?)
    }

    pub fn objects(&self) -> &Arc<O> {
        &self.objects
    }

    pub fn metadata(&self) -> &Arc<M> {
        &self.metadata
    }
}
