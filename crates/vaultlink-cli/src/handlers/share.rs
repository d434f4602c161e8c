//! Public share access handlers
//!
//! These routes carry no session: the token in the path is the credential.
//! Refusals are ordinary outcomes with a `status` body, not API errors.

use crate::error::ApiError;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use vaultlink_core::{
    ConfirmOutcome, ContentDescriptor, DownloadOutcome, EncryptionInfo, Permission, ResolveOutcome,
};

/// Response header naming the link's permission level
pub const PERMISSIONS_HEADER: &str = "x-permissions";
/// Response header set on downloads of client-side encrypted content
pub const ENCRYPTED_HEADER: &str = "x-encrypted";

/// Optional body of the POST share routes
#[derive(Debug, Default, Deserialize)]
pub struct PasswordBody {
    #[serde(default)]
    pub password: Option<String>,
}

impl PasswordBody {
    /// An empty body means no password
    fn parse(body: &Bytes) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("invalid body: {}", e)))
    }
}

/// What an anonymous recipient learns about a shared file
///
/// The storage locator stays server side. E2EE links carry the wrapped key
/// and nonce so the token alone is enough to decrypt with the private key.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedFileView {
    pub file_id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub permissions: Permission,
    pub is_one_time_download: bool,
    #[serde(rename = "isE2EE")]
    pub is_e2ee: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionInfo>,
}

impl From<ContentDescriptor> for SharedFileView {
    fn from(d: ContentDescriptor) -> Self {
        Self {
            file_id: d.file_id,
            filename: d.filename,
            content_type: d.content_type,
            size: d.size,
            permissions: d.permissions,
            is_one_time_download: d.is_one_time_download,
            is_e2ee: d.encryption.is_some(),
            encryption: d.encryption,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ShareStatusBody {
    pub status: &'static str,
    #[serde(flatten)]
    pub file: Option<SharedFileView>,
}

fn resolve_status_code(outcome: &ResolveOutcome) -> StatusCode {
    match outcome {
        ResolveOutcome::Granted(_) => StatusCode::OK,
        ResolveOutcome::PasswordRequired | ResolveOutcome::InvalidPassword => {
            StatusCode::UNAUTHORIZED
        }
        ResolveOutcome::Expired | ResolveOutcome::Consumed => StatusCode::GONE,
        ResolveOutcome::NotFound => StatusCode::NOT_FOUND,
    }
}

fn confirm_status_code(outcome: ConfirmOutcome) -> StatusCode {
    match outcome {
        ConfirmOutcome::Confirmed => StatusCode::OK,
        ConfirmOutcome::AlreadyConsumed => StatusCode::CONFLICT,
        ConfirmOutcome::NotOneTimeLink => StatusCode::BAD_REQUEST,
        ConfirmOutcome::NotFound => StatusCode::NOT_FOUND,
        ConfirmOutcome::Expired => StatusCode::GONE,
        ConfirmOutcome::PasswordRequired | ConfirmOutcome::InvalidPassword => {
            StatusCode::UNAUTHORIZED
        }
    }
}

fn outcome_response(outcome: ResolveOutcome) -> Response {
    let status = resolve_status_code(&outcome);
    let body = ShareStatusBody {
        status: outcome.status(),
        file: match outcome {
            ResolveOutcome::Granted(descriptor) => Some(descriptor.into()),
            _ => None,
        },
    };
    (status, Json(body)).into_response()
}

fn refusal(status: StatusCode, name: &'static str) -> Response {
    (status, Json(ShareStatusBody { status: name, file: None })).into_response()
}

/// GET /api/share/{token} - preview a link without a password
pub async fn resolve_share(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    let outcome = state.resolver.resolve(&token, None).await?;
    Ok(outcome_response(outcome))
}

/// POST /api/share/{token} - preview a link, optionally with a password
pub async fn resolve_share_with_password(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let body = PasswordBody::parse(&body)?;
    let outcome = state
        .resolver
        .resolve(&token, body.password.as_deref())
        .await?;
    Ok(outcome_response(outcome))
}

/// POST /api/share/{token}/confirm - consume a one-time grant
pub async fn confirm_share(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let body = PasswordBody::parse(&body)?;
    let outcome = state
        .resolver
        .confirm_download(&token, body.password.as_deref())
        .await?;
    Ok(refusal(confirm_status_code(outcome), outcome.status()))
}

/// POST /api/share/{token}/download - fetch the stored bytes
///
/// One-time grants are consumed by a successful download.
pub async fn download_share(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let body = PasswordBody::parse(&body)?;
    let outcome = state
        .resolver
        .download(state.objects.as_ref(), &token, body.password.as_deref())
        .await?;

    let (descriptor, data) = match outcome {
        DownloadOutcome::Content { descriptor, data } => (descriptor, data),
        DownloadOutcome::ViewOnly => return Ok(refusal(StatusCode::FORBIDDEN, "viewOnly")),
        DownloadOutcome::PasswordRequired => {
            return Ok(outcome_response(ResolveOutcome::PasswordRequired))
        }
        DownloadOutcome::InvalidPassword => {
            return Ok(outcome_response(ResolveOutcome::InvalidPassword))
        }
        DownloadOutcome::Expired => return Ok(outcome_response(ResolveOutcome::Expired)),
        DownloadOutcome::Consumed => return Ok(outcome_response(ResolveOutcome::Consumed)),
        DownloadOutcome::NotFound => return Ok(outcome_response(ResolveOutcome::NotFound)),
    };

    Ok((StatusCode::OK, download_headers(&descriptor)?, data).into_response())
}

fn download_headers(descriptor: &ContentDescriptor) -> Result<HeaderMap, ApiError> {
    let value = |s: &str| {
        HeaderValue::from_str(s).map_err(|e| ApiError::Internal(format!("bad header value: {}", e)))
    };
    let encrypted = descriptor.encryption.is_some();
    let content_type = if encrypted {
        "application/octet-stream"
    } else {
        descriptor.content_type.as_str()
    };

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, value(content_type)?);
    headers.insert(
        header::CONTENT_DISPOSITION,
        value(&format!(
            "attachment; filename*=UTF-8''{}",
            urlencoding::encode(&descriptor.filename)
        ))?,
    );
    headers.insert(PERMISSIONS_HEADER, value(descriptor.permissions.as_str())?);
    headers.insert(ENCRYPTED_HEADER, value(if encrypted { "true" } else { "false" })?);
    Ok(headers)
}
