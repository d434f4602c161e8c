//! Public key directory backed by the gateway

use crate::transport::Transport;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use vaultlink_crypto::{CryptoError, PublicKey, PublicKeyDirectory};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicKeyResponse {
    public_key: String,
}

/// [`PublicKeyDirectory`] over `PUT /api/keys` and `GET /api/keys/{principal}`
///
/// `register` always publishes the key of the authenticated principal; the
/// gateway takes the principal from the bearer token.
#[derive(Clone)]
pub struct HttpKeyDirectory {
    transport: Arc<Transport>,
}

impl HttpKeyDirectory {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }
}

fn directory_error(e: impl std::fmt::Display) -> CryptoError {
    CryptoError::Directory(e.to_string())
}

#[async_trait]
impl PublicKeyDirectory for HttpKeyDirectory {
    async fn register(&self, _principal: &str, key: &PublicKey) -> vaultlink_crypto::Result<()> {
        let req = self
            .transport
            .request(Method::PUT, "/api/keys")
            .json(&json!({ "publicKey": key.to_base64()? }));
        self.transport.send(req).await.map_err(directory_error)?;
        Ok(())
    }

    async fn lookup(&self, principal: &str) -> vaultlink_crypto::Result<Option<PublicKey>> {
        let path = format!("/api/keys/{}", urlencoding::encode(principal));
        let response = self
            .transport
            .request(Method::GET, &path)
            .send()
            .await
            .map_err(directory_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(CryptoError::Directory(format!(
                "key lookup failed with HTTP {}",
                response.status().as_u16()
            )));
        }

        let body: PublicKeyResponse = response.json().await.map_err(directory_error)?;
        Ok(Some(PublicKey::from_base64(&body.public_key)?))
    }
}
