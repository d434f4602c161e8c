//! Request and response types

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vaultlink_core::{ConfirmOutcome, EncryptionInfo, Permission};

pub use vaultlink_core::{FileMetadata, LinkStatus, LinkSummary, StorageUsage};

/// Options for a new share link
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub is_one_time_download: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub permissions: Permission,
    #[serde(rename = "isE2EE")]
    pub is_e2ee: bool,
}

impl ShareOptions {
    pub fn new(permissions: Permission) -> Self {
        Self {
            permissions,
            ..Default::default()
        }
    }

    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    pub fn one_time(mut self) -> Self {
        self.is_one_time_download = true;
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Carry the file's wrapped key and nonce in the link
    pub fn e2ee(mut self) -> Self {
        self.is_e2ee = true;
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateLinkBody<'a> {
    pub file_id: Uuid,
    #[serde(flatten)]
    pub options: &'a ShareOptions,
}

/// A link returned by the gateway
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct IssuedShare {
    pub token: String,
    pub url: String,
}

/// File details visible to a share recipient
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedFile {
    pub file_id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub permissions: Permission,
    pub is_one_time_download: bool,
    #[serde(rename = "isE2EE")]
    pub is_e2ee: bool,
    /// Wrapped key and nonce, present on E2EE links
    #[serde(default)]
    pub encryption: Option<EncryptionInfo>,
}

/// Outcome of previewing a share link
#[derive(Clone, Debug, PartialEq)]
pub enum ShareStatus {
    Granted(SharedFile),
    PasswordRequired,
    InvalidPassword,
    Expired,
    Consumed,
    NotFound,
}

impl ShareStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }

    /// Wire name of the outcome
    pub fn status(&self) -> &'static str {
        match self {
            Self::Granted(_) => "granted",
            Self::PasswordRequired => "passwordRequired",
            Self::InvalidPassword => "invalidPassword",
            Self::Expired => "expired",
            Self::Consumed => "consumed",
            Self::NotFound => "notFound",
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct StatusBody {
    pub status: String,
    #[serde(flatten)]
    pub rest: serde_json::Value,
}

/// Map a confirm `status` string back to its outcome
pub(crate) fn confirm_outcome(status: &str) -> Option<ConfirmOutcome> {
    let outcome = match status {
        "confirmed" => ConfirmOutcome::Confirmed,
        "alreadyConsumed" => ConfirmOutcome::AlreadyConsumed,
        "notOneTimeLink" => ConfirmOutcome::NotOneTimeLink,
        "notFound" => ConfirmOutcome::NotFound,
        "expired" => ConfirmOutcome::Expired,
        "passwordRequired" => ConfirmOutcome::PasswordRequired,
        "invalidPassword" => ConfirmOutcome::InvalidPassword,
        _ => return None,
    };
    Some(outcome)
}

/// Bytes fetched through a share link
#[derive(Clone, Debug)]
pub struct Download {
    pub data: Bytes,
    pub permissions: Option<Permission>,
    pub content_type: Option<String>,
    /// Whether the bytes are client-side ciphertext
    pub encrypted: bool,
}
