//! Public key directory handlers

use super::{require_read, require_write};
use crate::error::{ApiError, ErrorCode};
use crate::{state::UserSession, AppState};
use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use vaultlink_crypto::{PublicKey, PublicKeyDirectory};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterKeyRequest {
    /// Base64 SPKI DER
    pub public_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyResponse {
    pub principal: String,
    pub public_key: String,
}

/// PUT /api/keys - register the caller's public key
///
/// Re-registering the same key is a no-op; a different key is refused so a
/// principal's key pair never rotates behind the backs of their senders.
pub async fn register_key(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    Json(req): Json<RegisterKeyRequest>,
) -> Result<(StatusCode, Json<PublicKeyResponse>), ApiError> {
    require_write(&session)?;

    let key = PublicKey::from_base64(&req.public_key)?;
    let canonical = key.to_base64()?;

    let _guard = state.key_registration.lock().await;
    let status = match state.keys.lookup(&session.principal).await? {
        Some(existing) if existing.to_base64()? == canonical => StatusCode::OK,
        Some(_) => {
            return Err(ApiError::new(
                ErrorCode::KeyConflict,
                "A different public key is already registered",
            ))
        }
        None => {
            state.keys.register(&session.principal, &key).await?;
            tracing::info!(principal = %session.principal, bits = key.bits(), "Public key registered");
            StatusCode::CREATED
        }
    };

    Ok((
        status,
        Json(PublicKeyResponse {
            principal: session.principal,
            public_key: canonical,
        }),
    ))
}

/// GET /api/keys/{principal}
pub async fn get_key(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    Path(principal): Path<String>,
) -> Result<Json<PublicKeyResponse>, ApiError> {
    require_read(&session)?;

    let key = state.keys.lookup(&principal).await?.ok_or_else(|| {
        ApiError::new(ErrorCode::KeyNotFound, format!("No public key for {}", principal))
    })?;

    Ok(Json(PublicKeyResponse {
        principal,
        public_key: key.to_base64()?,
    }))
}
