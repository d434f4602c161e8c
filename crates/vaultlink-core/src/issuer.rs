//! Share link issuance

use crate::{
    clock::{system_clock, SharedClock},
    link::{LinkPolicy, LinkSummary, ShareLink},
    share_url::ShareUrl,
    store::MetadataStore,
    token::generate_token,
    CoreError, Result,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use vaultlink_crypto::hashing::fingerprint;

/// Attempts at minting a unique token before giving up
const MAX_TOKEN_ATTEMPTS: usize = 3;

/// A newly issued link and the URL to hand out
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedLink {
    pub token: String,
    pub url: String,
    #[serde(skip)]
    pub link: ShareLink,
}

/// Mints share links for files
pub struct LinkIssuer<M: MetadataStore> {
    metadata: Arc<M>,
    clock: SharedClock,
    base_url: String,
}

impl<M: MetadataStore> Clone for LinkIssuer<M> {
    fn clone(&self) -> Self {
        Self {
            metadata: Arc::clone(&self.metadata),
            clock: Arc::clone(&self.clock),
            base_url: self.base_url.clone(),
        }
    }
}

impl<M: MetadataStore> LinkIssuer<M> {
    /// `base_url` is the public origin share URLs are composed under
    pub fn new(metadata: Arc<M>, base_url: impl Into<String>) -> Self {
        Self::with_clock(metadata, base_url, system_clock())
    }

    pub fn with_clock(metadata: Arc<M>, base_url: impl Into<String>, clock: SharedClock) -> Self {
        Self {
            metadata,
            clock,
            base_url: base_url.into(),
        }
    }

    /// Issue a link for `file_id` on behalf of its owner
    #[instrument(skip(self, policy), fields(file_id = %file_id))]
    pub async fn issue_link(
        &self,
        owner: &str,
        file_id: &Uuid,
        policy: LinkPolicy,
    ) -> Result<IssuedLink> {
        policy.validate(self.clock.now())?;

        let file = match self.metadata.get_file(file_id).await? {
            Some(file) if file.is_owned_by(owner) => file,
            _ => return Err(CoreError::FileNotFound(file_id.to_string())),
        };

        let encryption = if policy.is_e2ee() {
            match &file.encryption {
                Some(enc) => Some(enc.clone()),
                None => {
                    return Err(CoreError::PolicyFileMismatch(
                        "E2EE link requested for a file uploaded without encryption".to_string(),
                    ))
                }
            }
        } else {
            None
        };

        let password_hash = match policy.password() {
            Some(password) => Some(vaultlink_crypto::hash_password(password).await?),
            None => None,
        };

        let mut attempt = 0;
        let link = loop {
            attempt += 1;
            let link = ShareLink {
                token: generate_token(),
                file_id: file.id,
                owner: owner.to_string(),
                password_hash: password_hash.clone(),
                expires_at: policy.expires_at(),
                is_one_time_download: policy.is_one_time(),
                used: false,
                permissions: policy.permissions(),
                is_e2ee: policy.is_e2ee(),
                encryption: encryption.clone(),
                created_at: self.clock.now(),
            };
            match self.metadata.insert_link(link.clone()).await {
                Ok(()) => break link,
                Err(CoreError::TokenCollision) if attempt < MAX_TOKEN_ATTEMPTS => {
                    warn!(attempt, "Share token collision, retrying");
                }
                Err(e) => return Err(e),
            }
        };

        let mut share_url = ShareUrl::new(&self.base_url, &link.token);
        if let Some(enc) = &link.encryption {
            share_url = share_url.with_encryption(enc.clone());
        }

        info!(
            token = %fingerprint(&link.token),
            one_time = link.is_one_time_download,
            password = link.is_password_protected(),
            e2ee = link.is_e2ee,
            "Share link issued"
        );

        Ok(IssuedLink {
            token: link.token.clone(),
            url: share_url.to_url(),
            link,
        })
    }

    /// Delete a link owned by `owner`
    #[instrument(skip(self, token), fields(token = %fingerprint(token)))]
    pub async fn revoke(&self, owner: &str, token: &str) -> Result<()> {
        match self.metadata.get_link(token).await? {
            Some(link) if link.owner == owner => {
                self.metadata.delete_link(token).await?;
                info!("Share link revoked");
                Ok(())
            }
            _ => Err(CoreError::LinkNotFound),
        }
    }

    /// Summaries of every link `owner` has issued, newest first
    pub async fn list_links_for_principal(&self, owner: &str) -> Result<Vec<LinkSummary>> {
        let now = self.clock.now();
        let filenames: HashMap<Uuid, String> = self
            .metadata
            .list_files(owner)
            .await?
            .into_iter()
            .map(|f| (f.id, f.filename))
            .collect();

        let mut summaries: Vec<LinkSummary> = self
            .metadata
            .list_links(owner)
            .await?
            .iter()
            .map(|link| {
                let filename = filenames.get(&link.file_id).cloned().unwrap_or_default();
                LinkSummary::from_link(link, filename, now)
            })
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::{EncryptionInfo, FileMetadata, Permission},
        store::MemoryMetadataStore,
    };
    use chrono::{Duration, Utc};
    use vaultlink_crypto::Nonce;

    fn file(owner: &str, encrypted: bool) -> FileMetadata {
        let now = Utc::now();
        FileMetadata {
            id: Uuid::new_v4(),
            owner: owner.to_string(),
            storage_locator: format!("{}/{}", owner, Uuid::new_v4()),
            filename: "report.pdf".into(),
            size: 10,
            content_type: "application/pdf".into(),
            checksum: String::new(),
            encryption: encrypted.then(|| EncryptionInfo {
                wrapped_key: vec![7; 256],
                nonce: Nonce::generate(),
            }),
            created_at: now,
            updated_at: now,
        }
    }

    async fn setup(encrypted: bool) -> (LinkIssuer<MemoryMetadataStore>, Arc<MemoryMetadataStore>, Uuid) {
        let store = Arc::new(MemoryMetadataStore::new());
        let f = file("alice", encrypted);
        let id = f.id;
        store.insert_file(f).await.unwrap();
        (LinkIssuer::new(store.clone(), "https://vault.example"), store, id)
    }

    #[tokio::test]
    async fn test_issue_plain_link() {
        let (issuer, store, id) = setup(false).await;
        let issued = issuer
            .issue_link("alice", &id, LinkPolicy::builder().permissions(Permission::Download).build().unwrap())
            .await
            .unwrap();

        assert_eq!(issued.url, format!("https://vault.example/share/{}", issued.token));
        let stored = store.get_link(&issued.token).await.unwrap().unwrap();
        assert_eq!(stored.file_id, id);
        assert!(!stored.used);
        assert!(stored.encryption.is_none());
    }

    #[tokio::test]
    async fn test_unknown_or_foreign_file() {
        let (issuer, _, id) = setup(false).await;
        let policy = || LinkPolicy::builder().build().unwrap();

        let err = issuer.issue_link("alice", &Uuid::new_v4(), policy()).await.unwrap_err();
        assert!(matches!(err, CoreError::FileNotFound(_)));

        let err = issuer.issue_link("mallory", &id, policy()).await.unwrap_err();
        assert!(matches!(err, CoreError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_e2ee_requires_encrypted_file() {
        let (issuer, _, id) = setup(false).await;
        let err = issuer
            .issue_link("alice", &id, LinkPolicy::builder().e2ee(true).build().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::PolicyFileMismatch(_)));
    }

    #[tokio::test]
    async fn test_e2ee_link_carries_key_material() {
        let (issuer, store, id) = setup(true).await;
        let issued = issuer
            .issue_link("alice", &id, LinkPolicy::builder().e2ee(true).build().unwrap())
            .await
            .unwrap();

        assert!(issued.url.contains("?iv="));
        assert!(issued.url.contains("&key="));
        let stored = store.get_link(&issued.token).await.unwrap().unwrap();
        let file = store.get_file(&id).await.unwrap().unwrap();
        assert_eq!(stored.encryption, file.encryption);
    }

    #[tokio::test]
    async fn test_password_is_hashed() {
        let (issuer, store, id) = setup(false).await;
        let issued = issuer
            .issue_link("alice", &id, LinkPolicy::builder().password("open sesame").build().unwrap())
            .await
            .unwrap();

        let stored = store.get_link(&issued.token).await.unwrap().unwrap();
        let hash = stored.password_hash.unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("open sesame"));
    }

    #[tokio::test]
    async fn test_expired_policy_rejected_before_lookup() {
        let (issuer, _, _) = setup(false).await;
        let policy = LinkPolicy::builder()
            .expires_at(Utc::now() - Duration::hours(1))
            .build()
            .unwrap();
        // Unknown file id: validation must fail first
        let err = issuer.issue_link("alice", &Uuid::new_v4(), policy).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidPolicy(_)));
    }

    #[tokio::test]
    async fn test_revoke_and_list() {
        let (issuer, _, id) = setup(false).await;
        let a = issuer.issue_link("alice", &id, LinkPolicy::builder().build().unwrap()).await.unwrap();
        let b = issuer.issue_link("alice", &id, LinkPolicy::builder().one_time(true).build().unwrap()).await.unwrap();

        let links = issuer.list_links_for_principal("alice").await.unwrap();
        assert_eq!(links.len(), 2);
        assert!(links.iter().all(|l| l.filename == "report.pdf"));
        assert!(issuer.list_links_for_principal("bob").await.unwrap().is_empty());

        assert!(matches!(issuer.revoke("bob", &a.token).await, Err(CoreError::LinkNotFound)));
        issuer.revoke("alice", &a.token).await.unwrap();

        let links = issuer.list_links_for_principal("alice").await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].token, b.token);
        assert!(links[0].is_one_time_download);
    }
}
