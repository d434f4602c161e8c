//! Access-time evaluation of share links
//!
//! State is derived from the stored record on every request; nothing is
//! cached between calls. Evaluation order for `resolve`:
//!
//! 1. unknown token            -> `NotFound`
//! 2. expiry in the past       -> `Expired`
//! 3. one-time and used        -> `Consumed`
//! 4. password set, none given -> `PasswordRequired`
//! 5. password mismatch        -> `InvalidPassword`
//! 6. otherwise                -> `Granted`
//!
//! `resolve` never mutates the record. Only `confirm_download` (and
//! `download`, which calls the same compare-and-swap) burns a one-time grant.

use crate::{
    clock::{system_clock, SharedClock},
    link::ShareLink,
    metadata::{EncryptionInfo, Permission},
    store::{ConsumeResult, MetadataStore},
    token, Result,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;
use vaultlink_crypto::hashing::fingerprint;
use vaultlink_store::ObjectStore;

/// What a granted request may fetch
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDescriptor {
    pub file_id: Uuid,
    pub storage_locator: String,
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub permissions: Permission,
    pub is_one_time_download: bool,
    /// Wrapped key and nonce for E2EE links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionInfo>,
}

/// Result of evaluating a link
#[derive(Clone, Debug, PartialEq)]
pub enum ResolveOutcome {
    Granted(ContentDescriptor),
    PasswordRequired,
    InvalidPassword,
    Expired,
    Consumed,
    NotFound,
}

impl ResolveOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }

    /// Stable wire name of the outcome
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

/// Result of an explicit download confirmation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// The one-time grant was consumed by this call
    Confirmed,
    AlreadyConsumed,
    NotOneTimeLink,
    NotFound,
    Expired,
    PasswordRequired,
    InvalidPassword,
}

impl ConfirmOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::AlreadyConsumed => "alreadyConsumed",
            Self::NotOneTimeLink => "notOneTimeLink",
            Self::NotFound => "notFound",
            Self::Expired => "expired",
            Self::PasswordRequired => "passwordRequired",
            Self::InvalidPassword => "invalidPassword",
        }
    }
}

/// Result of a resolve-and-fetch
#[derive(Clone, Debug, PartialEq)]
pub enum DownloadOutcome {
    Content {
        descriptor: ContentDescriptor,
        data: Bytes,
    },
    /// Link is valid but only permits viewing
    ViewOnly,
    PasswordRequired,
    InvalidPassword,
    Expired,
    Consumed,
    NotFound,
}

enum Gate {
    Open(ShareLink),
    NotFound,
    Expired,
    Consumed,
    PasswordRequired,
    InvalidPassword,
}

/// Evaluates share tokens against their stored policy
pub struct LinkResolver<M: MetadataStore> {
    metadata: Arc<M>,
    clock: SharedClock,
}

impl<M: MetadataStore> Clone for LinkResolver<M> {
    fn clone(&self) -> Self {
        Self {
            metadata: Arc::clone(&self.metadata),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<M: MetadataStore> LinkResolver<M> {
    pub fn new(metadata: Arc<M>) -> Self {
        Self::with_clock(metadata, system_clock())
    }

    pub fn with_clock(metadata: Arc<M>, clock: SharedClock) -> Self {
        Self { metadata, clock }
    }

    /// Evaluate a token without mutating anything
    #[instrument(skip_all, fields(token = %fingerprint(token)))]
    pub async fn resolve(&self, token: &str, password: Option<&str>) -> Result<ResolveOutcome> {
        let Some(link) = self.lookup(token).await? else {
            return Ok(ResolveOutcome::NotFound);
        };
        if link.is_expired(self.clock.now()) {
            return Ok(ResolveOutcome::Expired);
        }
        if link.is_consumed() {
            return Ok(ResolveOutcome::Consumed);
        }
        match self.check_password(&link, password).await? {
            Some(Gate::PasswordRequired) => return Ok(ResolveOutcome::PasswordRequired),
            Some(Gate::InvalidPassword) => return Ok(ResolveOutcome::InvalidPassword),
            _ => {}
        }

        let Some(descriptor) = self.describe(&link).await? else {
            return Ok(ResolveOutcome::NotFound);
        };
        debug!("Link granted");
        Ok(ResolveOutcome::Granted(descriptor))
    }

    /// Consume a one-time grant
    ///
    /// A used grant reports `AlreadyConsumed` whatever password is given.
    /// Otherwise the password gate runs before the compare-and-swap so a bare
    /// token cannot burn a protected link.
    #[instrument(skip_all, fields(token = %fingerprint(token)))]
    pub async fn confirm_download(
        &self,
        token: &str,
        password: Option<&str>,
    ) -> Result<ConfirmOutcome> {
        let link = match self.gate(token, password).await? {
            Gate::Open(link) => link,
            Gate::NotFound => return Ok(ConfirmOutcome::NotFound),
            Gate::Expired => return Ok(ConfirmOutcome::Expired),
            Gate::Consumed => return Ok(ConfirmOutcome::AlreadyConsumed),
            Gate::PasswordRequired => return Ok(ConfirmOutcome::PasswordRequired),
            Gate::InvalidPassword => return Ok(ConfirmOutcome::InvalidPassword),
        };
        if !link.is_one_time_download {
            return Ok(ConfirmOutcome::NotOneTimeLink);
        }

        let outcome = match self.metadata.consume_one_time(token).await? {
            ConsumeResult::Consumed(_) => {
                info!("One-time grant consumed");
                ConfirmOutcome::Confirmed
            }
            ConsumeResult::AlreadyUsed => ConfirmOutcome::AlreadyConsumed,
            ConsumeResult::NotOneTime => ConfirmOutcome::NotOneTimeLink,
            ConsumeResult::NotFound => ConfirmOutcome::NotFound,
        };
        Ok(outcome)
    }

    /// Resolve, fetch the bytes, and consume the grant if one-time
    ///
    /// Bytes are read before the grant is consumed so a storage failure
    /// leaves the grant intact. A caller that loses the consumption race gets
    /// `Consumed` and no bytes.
    #[instrument(skip_all, fields(token = %fingerprint(token)))]
    pub async fn download<O: ObjectStore + ?Sized>(
        &self,
        objects: &O,
        token: &str,
        password: Option<&str>,
    ) -> Result<DownloadOutcome> {
        let descriptor = match self.resolve(token, password).await? {
            ResolveOutcome::Granted(descriptor) => descriptor,
            ResolveOutcome::PasswordRequired => return Ok(DownloadOutcome::PasswordRequired),
            ResolveOutcome::InvalidPassword => return Ok(DownloadOutcome::InvalidPassword),
            ResolveOutcome::Expired => return Ok(DownloadOutcome::Expired),
            ResolveOutcome::Consumed => return Ok(DownloadOutcome::Consumed),
            ResolveOutcome::NotFound => return Ok(DownloadOutcome::NotFound),
        };
        if !descriptor.permissions.allows_download() {
            return Ok(DownloadOutcome::ViewOnly);
        }

        let data = objects.get(&descriptor.storage_locator).await?;

        if descriptor.is_one_time_download {
            match self.metadata.consume_one_time(token).await? {
                ConsumeResult::Consumed(_) => info!("One-time grant consumed by download"),
                ConsumeResult::AlreadyUsed => return Ok(DownloadOutcome::Consumed),
                ConsumeResult::NotFound => return Ok(DownloadOutcome::NotFound),
                ConsumeResult::NotOneTime => {}
            }
        }

        Ok(DownloadOutcome::Content { descriptor, data })
    }

    async fn lookup(&self, token: &str) -> Result<Option<ShareLink>> {
        if !token::is_well_formed(token) {
            return Ok(None);
        }
        self.metadata.get_link(token).await
    }

    /// NotFound, Expired, Consumed and password checks, in `resolve` order
    async fn gate(&self, token: &str, password: Option<&str>) -> Result<Gate> {
        let Some(link) = self.lookup(token).await? else {
            return Ok(Gate::NotFound);
        };
        if link.is_expired(self.clock.now()) {
            return Ok(Gate::Expired);
        }
        if link.is_consumed() {
            return Ok(Gate::Consumed);
        }
        if let Some(refusal) = self.check_password(&link, password).await? {
            return Ok(refusal);
        }
        Ok(Gate::Open(link))
    }

    async fn check_password(&self, link: &ShareLink, password: Option<&str>) -> Result<Option<Gate>> {
        let Some(hash) = &link.password_hash else {
            return Ok(None);
        };
        let Some(password) = password else {
            return Ok(Some(Gate::PasswordRequired));
        };
        if vaultlink_crypto::verify_password(password, hash).await? {
            Ok(None)
        } else {
            Ok(Some(Gate::InvalidPassword))
        }
    }

    async fn describe(&self, link: &ShareLink) -> Result<Option<ContentDescriptor>> {
        let Some(file) = self.metadata.get_file(&link.file_id).await? else {
            return Ok(None);
        };
        Ok(Some(ContentDescriptor {
            file_id: file.id,
            storage_locator: file.storage_locator,
            filename: file.filename,
            content_type: file.content_type,
            size: file.size,
            permissions: link.permissions,
            is_one_time_download: link.is_one_time_download,
            encryption: link.encryption.clone(),
        }))
    }
}
