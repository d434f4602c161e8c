//! File metadata types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vaultlink_crypto::{envelope::base64_vec_serde, Nonce};

/// Maximum filename length in bytes
pub const MAX_FILENAME_LEN: usize = 255;

/// Access level granted by a share link
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "Full Access")]
    FullAccess,
    #[default]
    #[serde(rename = "View Only")]
    ViewOnly,
    #[serde(rename = "Edit")]
    Edit,
    #[serde(rename = "Download")]
    Download,
}

impl Permission {
    /// Whether the holder may fetch the file bytes, not just view metadata
    pub fn allows_download(&self) -> bool {
        !matches!(self, Self::ViewOnly)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullAccess => "Full Access",
            Self::ViewOnly => "View Only",
            Self::Edit => "Edit",
            Self::Download => "Download",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Full Access" => Ok(Self::FullAccess),
            "View Only" => Ok(Self::ViewOnly),
            "Edit" => Ok(Self::Edit),
            "Download" => Ok(Self::Download),
            other => Err(format!("unknown permission: {}", other)),
        }
    }
}

/// Key material needed to decrypt an encrypted object
///
/// Present on a file iff it was uploaded encrypted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionInfo {
    /// Content key wrapped under the owner's public key
    #[serde(with = "base64_vec_serde")]
    pub wrapped_key: Vec<u8>,
    /// AES-GCM nonce
    pub nonce: Nonce,
}

/// Metadata for an uploaded file
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    /// File identifier
    pub id: Uuid,
    /// Owning principal
    pub owner: String,
    /// Where the bytes live in the object store
    pub storage_locator: String,
    /// Filename as uploaded
    pub filename: String,
    /// Stored size in bytes (ciphertext size for encrypted files)
    pub size: u64,
    /// MIME type
    pub content_type: String,
    /// BLAKE3 checksum of the stored bytes
    pub checksum: String,
    /// Wrapped key and nonce, only for encrypted uploads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionInfo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileMetadata {
    /// Whether the content was encrypted before upload
    pub fn is_encrypted(&self) -> bool {
        self.encryption.is_some()
    }

    /// Whether `principal` owns this file
    pub fn is_owned_by(&self, principal: &str) -> bool {
        self.owner == principal
    }
}

/// Aggregate storage used by a principal
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageUsage {
    pub file_count: u64,
    pub total_bytes: u64,
}

/// Storage locator for a new object owned by `owner`
pub fn new_storage_locator(owner: &str) -> String {
    format!("{}/{}", owner, Uuid::new_v4())
}

/// Validate a user-supplied filename
pub fn validate_filename(name: &str) -> std::result::Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("filename must not be empty".to_string());
    }
    if name.len() > MAX_FILENAME_LEN {
        return Err(format!("filename exceeds {} bytes", MAX_FILENAME_LEN));
    }
    if name.chars().any(|c| c.is_control() || c == '/' || c == '\\') {
        return Err("filename contains a path separator or control character".to_string());
    }
    Ok(())
}
