//! File handlers

use super::{require_read, require_write};
use crate::error::ApiError;
use crate::{state::UserSession, AppState};
use axum::{
    extract::{Extension, Path, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use vaultlink_core::{EncryptionInfo, FileMetadata, StorageUsage, UploadRequest};
use vaultlink_crypto::Nonce;

/// Header carrying the percent-encoded filename of an upload
pub const FILENAME_HEADER: &str = "x-filename";
/// Header carrying the base64 wrapped content key of an encrypted upload
pub const WRAPPED_KEY_HEADER: &str = "x-wrapped-key";
/// Header carrying the base64 AES-GCM nonce of an encrypted upload
pub const NONCE_HEADER: &str = "x-nonce";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, ApiError> {
    headers
        .get(name)
        .map(|v| {
            v.to_str()
                .map_err(|_| ApiError::bad_request(format!("{} is not valid ASCII", name)))
        })
        .transpose()
}

fn encryption_from_headers(headers: &HeaderMap) -> Result<Option<EncryptionInfo>, ApiError> {
    match (
        header_str(headers, WRAPPED_KEY_HEADER)?,
        header_str(headers, NONCE_HEADER)?,
    ) {
        (None, None) => Ok(None),
        (Some(key), Some(nonce)) => {
            let wrapped_key = STANDARD
                .decode(key)
                .map_err(|_| ApiError::bad_request("x-wrapped-key is not valid base64"))?;
            if wrapped_key.is_empty() {
                return Err(ApiError::bad_request("x-wrapped-key is empty"));
            }
            Ok(Some(EncryptionInfo {
                wrapped_key,
                nonce: Nonce::from_base64(nonce)?,
            }))
        }
        _ => Err(ApiError::bad_request(
            "x-wrapped-key and x-nonce must be sent together",
        )),
    }
}

/// POST /api/files - upload raw bytes (ciphertext when encrypted client-side)
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<FileMetadata>), ApiError> {
    require_write(&session)?;

    let raw_name = header_str(&headers, FILENAME_HEADER)?
        .ok_or_else(|| ApiError::bad_request("missing x-filename header"))?;
    let filename = urlencoding::decode(raw_name)
        .map_err(|_| ApiError::bad_request("x-filename is not valid UTF-8"))?
        .into_owned();

    let content_type = match header_str(&headers, header::CONTENT_TYPE.as_str())? {
        Some(ct) if !ct.is_empty() => ct.to_string(),
        _ => mime_guess::from_path(&filename)
            .first_or_octet_stream()
            .to_string(),
    };

    let request = UploadRequest {
        filename,
        content_type,
        data: body,
        encryption: encryption_from_headers(&headers)?,
    };
    let file = state.files.upload(&session.principal, request).await?;

    Ok((StatusCode::CREATED, Json(file)))
}

/// GET /api/files - newest first
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<Vec<FileMetadata>>, ApiError> {
    require_read(&session)?;
    Ok(Json(state.files.list(&session.principal).await?))
}

/// GET /api/files/usage
pub async fn storage_usage(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<StorageUsage>, ApiError> {
    require_read(&session)?;
    Ok(Json(state.files.usage(&session.principal).await?))
}

/// GET /api/files/{id}
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    Path(id): Path<Uuid>,
) -> Result<Json<FileMetadata>, ApiError> {
    require_read(&session)?;
    Ok(Json(state.files.get(&session.principal, &id).await?))
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub filename: String,
}

/// PUT /api/files/{id}/rename
pub async fn rename_file(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    Path(id): Path<Uuid>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<FileMetadata>, ApiError> {
    require_write(&session)?;
    Ok(Json(
        state
            .files
            .rename(&session.principal, &id, &req.filename)
            .await?,
    ))
}

/// DELETE /api/files/{id} - also removes every link to the file
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_write(&session)?;
    state.files.delete(&session.principal, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
