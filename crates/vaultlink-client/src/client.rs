//! Main client implementation

use crate::{
    directory::HttpKeyDirectory,
    encryption::{decrypt_shared, decrypt_with, upload_headers},
    transport::Transport,
    types::*,
    ClientError, Config, Result,
};
use bytes::Bytes;
use reqwest::{header, Method, Response};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;
use vaultlink_core::{ConfirmOutcome, Permission, ShareUrl};
use vaultlink_crypto::{EnvelopeEncryptor, KeyManager, KeyPair, KeyStore, PrivateKey, PublicKey};

/// Vaultlink client acting for one principal
///
/// The principal's private key lives in the injected [`KeyStore`] and never
/// leaves the process; the public half is published to the gateway.
pub struct VaultClient<S: KeyStore> {
    transport: Arc<Transport>,
    keys: KeyManager<S, HttpKeyDirectory>,
    principal: String,
}

impl<S: KeyStore> VaultClient<S> {
    /// Create a client for `principal`, whose bearer token is in `config`
    pub fn new(config: Config, principal: impl Into<String>, key_store: S) -> Result<Self> {
        let principal = principal.into();
        if principal.is_empty() {
            return Err(ClientError::Config("principal must not be empty".to_string()));
        }
        let transport = Arc::new(Transport::new(config)?);
        let keys = KeyManager::new(key_store, HttpKeyDirectory::new(Arc::clone(&transport)));
        Ok(Self {
            transport,
            keys,
            principal,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        self.transport.config()
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    pub fn key_manager(&self) -> &KeyManager<S, HttpKeyDirectory> {
        &self.keys
    }

    // ==================== Keys ====================

    /// Load or create this principal's key pair and make sure it is published
    #[instrument(skip(self), fields(principal = %self.principal))]
    pub async fn ensure_keys(&self) -> Result<KeyPair> {
        Ok(self.keys.get_or_create_key_pair(&self.principal).await?)
    }

    /// Look up another principal's published key
    pub async fn public_key_for(&self, principal: &str) -> Result<PublicKey> {
        Ok(self.keys.public_key_for(principal).await?)
    }

    // ==================== Files ====================

    /// Upload a file, encrypting it for this principal when `encrypt` is set
    #[instrument(skip(self, data), fields(principal = %self.principal))]
    pub async fn upload(
        &self,
        filename: &str,
        content_type: Option<&str>,
        data: impl Into<Bytes>,
        encrypt: bool,
    ) -> Result<FileMetadata> {
        let recipient = if encrypt {
            Some(self.ensure_keys().await?.public_key().clone())
        } else {
            None
        };
        self.upload_inner(filename, content_type, data.into(), recipient.as_ref())
            .await
    }

    /// Upload a file encrypted for another principal's published key
    #[instrument(skip(self, data), fields(principal = %self.principal))]
    pub async fn upload_for_recipient(
        &self,
        recipient: &str,
        filename: &str,
        content_type: Option<&str>,
        data: impl Into<Bytes>,
    ) -> Result<FileMetadata> {
        let key = self.public_key_for(recipient).await?;
        self.upload_inner(filename, content_type, data.into(), Some(&key))
            .await
    }

    async fn upload_inner(
        &self,
        filename: &str,
        content_type: Option<&str>,
        data: Bytes,
        recipient: Option<&PublicKey>,
    ) -> Result<FileMetadata> {
        let content_type = content_type.map(str::to_string).unwrap_or_else(|| {
            mime_guess::from_path(filename)
                .first_or_octet_stream()
                .to_string()
        });

        let mut req = self
            .transport
            .request(Method::POST, "/api/files")
            .header("x-filename", urlencoding::encode(filename).into_owned())
            .header(header::CONTENT_TYPE, content_type);

        let body = match recipient {
            Some(key) => {
                let encrypted = EnvelopeEncryptor::new(key).encrypt(data).await?;
                for (name, value) in upload_headers(&encrypted) {
                    req = req.header(name, value);
                }
                debug!(size = encrypted.ciphertext.len(), "Uploading ciphertext");
                Bytes::from(encrypted.ciphertext)
            }
            None => data,
        };

        let response = self.transport.send(req.body(body)).await?;
        Ok(response.json().await?)
    }

    /// List this principal's files, newest first
    pub async fn list_files(&self) -> Result<Vec<FileMetadata>> {
        self.get_json("/api/files").await
    }

    pub async fn get_file(&self, file_id: &Uuid) -> Result<FileMetadata> {
        self.get_json(&format!("/api/files/{}", file_id)).await
    }

    pub async fn usage(&self) -> Result<StorageUsage> {
        self.get_json("/api/files/usage").await
    }

    pub async fn rename_file(&self, file_id: &Uuid, filename: &str) -> Result<FileMetadata> {
        let req = self
            .transport
            .request(Method::PUT, &format!("/api/files/{}/rename", file_id))
            .json(&json!({ "filename": filename }));
        Ok(self.transport.send(req).await?.json().await?)
    }

    /// Delete a file and every link to it
    pub async fn delete_file(&self, file_id: &Uuid) -> Result<()> {
        let req = self
            .transport
            .request(Method::DELETE, &format!("/api/files/{}", file_id));
        self.transport.send(req).await?;
        Ok(())
    }

    // ==================== Links ====================

    /// Issue a share link for one of this principal's files
    #[instrument(skip(self, options), fields(principal = %self.principal))]
    pub async fn issue_link(&self, file_id: &Uuid, options: &ShareOptions) -> Result<IssuedShare> {
        let req = self
            .transport
            .request(Method::POST, "/api/links")
            .json(&CreateLinkBody {
                file_id: *file_id,
                options,
            });
        Ok(self.transport.send(req).await?.json().await?)
    }

    pub async fn list_links(&self) -> Result<Vec<LinkSummary>> {
        self.get_json("/api/links").await
    }

    pub async fn revoke_link(&self, token: &str) -> Result<()> {
        let req = self
            .transport
            .request(Method::DELETE, &format!("/api/links/{}", token));
        self.transport.send(req).await?;
        Ok(())
    }

    // ==================== Share access ====================

    /// Preview a share link
    pub async fn resolve(&self, token: &str, password: Option<&str>) -> Result<ShareStatus> {
        let response = self.share_request(token, "", password).await?;
        let body = status_body(response).await?;
        let status = match body.status.as_str() {
            "granted" => ShareStatus::Granted(
                serde_json::from_value(body.rest)
                    .map_err(|e| ClientError::InvalidResponse(e.to_string()))?,
            ),
            "passwordRequired" => ShareStatus::PasswordRequired,
            "invalidPassword" => ShareStatus::InvalidPassword,
            "expired" => ShareStatus::Expired,
            "consumed" => ShareStatus::Consumed,
            "notFound" => ShareStatus::NotFound,
            other => {
                return Err(ClientError::InvalidResponse(format!(
                    "unknown share status {}",
                    other
                )))
            }
        };
        Ok(status)
    }

    /// Consume a one-time grant without downloading
    pub async fn confirm(&self, token: &str, password: Option<&str>) -> Result<ConfirmOutcome> {
        let response = self.share_request(token, "/confirm", password).await?;
        let body = status_body(response).await?;
        confirm_outcome(&body.status).ok_or_else(|| {
            ClientError::InvalidResponse(format!("unknown confirm status {}", body.status))
        })
    }

    /// Download the stored bytes behind a share link
    ///
    /// Refusals surface as [`ClientError::Refused`] carrying the status name.
    pub async fn download(&self, token: &str, password: Option<&str>) -> Result<Download> {
        let response = self.share_request(token, "/download", password).await?;
        if !response.status().is_success() {
            let body = status_body(response).await?;
            return Err(ClientError::Refused(body.status));
        }

        let headers = response.headers();
        let permissions = headers
            .get("x-permissions")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<Permission>().ok());
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let encrypted = headers
            .get("x-encrypted")
            .is_some_and(|v| v.as_bytes() == b"true");

        Ok(Download {
            data: response.bytes().await?,
            permissions,
            content_type,
            encrypted,
        })
    }

    /// Download through a full share URL and decrypt E2EE content
    ///
    /// Plain links return the bytes unchanged.
    #[instrument(skip_all)]
    pub async fn download_and_decrypt(
        &self,
        share_url: &str,
        password: Option<&str>,
        private_key: &PrivateKey,
    ) -> Result<Bytes> {
        let share = ShareUrl::parse(share_url)?;
        let download = self.download(share.token(), password).await?;
        if !share.is_e2ee() {
            return Ok(download.data);
        }
        let plaintext = decrypt_shared(&share, download.data, private_key).await?;
        Ok(Bytes::from(plaintext))
    }

    /// Download through a bare token and decrypt E2EE content
    ///
    /// Key material comes from the granted share rather than the URL. A
    /// refused share surfaces as [`ClientError::Refused`].
    #[instrument(skip_all)]
    pub async fn download_token_and_decrypt(
        &self,
        token: &str,
        password: Option<&str>,
        private_key: &PrivateKey,
    ) -> Result<Bytes> {
        let shared = match self.resolve(token, password).await? {
            ShareStatus::Granted(shared) => shared,
            refused => return Err(ClientError::Refused(refused.status().to_string())),
        };
        let download = self.download(token, password).await?;
        match &shared.encryption {
            Some(encryption) => Ok(Bytes::from(
                decrypt_with(encryption, download.data, private_key).await?,
            )),
            None => Ok(download.data),
        }
    }

    async fn share_request(
        &self,
        token: &str,
        suffix: &str,
        password: Option<&str>,
    ) -> Result<Response> {
        let path = format!("/api/share/{}{}", urlencoding::encode(token), suffix);
        Ok(self
            .transport
            .request(Method::POST, &path)
            .json(&json!({ "password": password }))
            .send()
            .await?)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let req = self.transport.request(Method::GET, path);
        Ok(self.transport.send(req).await?.json().await?)
    }
}

/// Parse a share-route `{status, ...}` body, whatever the HTTP status
async fn status_body(response: Response) -> Result<StatusBody> {
    let status = response.status();
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|_| ClientError::from_response(status.as_u16(), &text))
}
