//! Share link management handlers (owner side)

use super::{require_read, require_write};
use crate::error::ApiError;
use crate::{state::UserSession, AppState};
use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use vaultlink_core::{IssuedLink, LinkPolicy, LinkSummary, Permission};

/// Body of `POST /api/links`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLinkRequest {
    pub file_id: Uuid,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_one_time_download: bool,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub permissions: Permission,
    #[serde(default, rename = "isE2EE")]
    pub is_e2ee: bool,
}

impl CreateLinkRequest {
    fn into_policy(self, now: DateTime<Utc>) -> vaultlink_core::Result<LinkPolicy> {
        LinkPolicy::builder()
            .maybe_expires_at(self.expires_at)
            .one_time(self.is_one_time_download)
            .maybe_password(self.password)
            .permissions(self.permissions)
            .e2ee(self.is_e2ee)
            .build_at(now)
    }
}

/// POST /api/links - returns `{token, url}`
pub async fn create_link(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    Json(req): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<IssuedLink>), ApiError> {
    require_write(&session)?;

    let file_id = req.file_id;
    let policy = req.into_policy(state.clock.now())?;
    let issued = state
        .issuer
        .issue_link(&session.principal, &file_id, policy)
        .await?;

    Ok((StatusCode::CREATED, Json(issued)))
}

/// GET /api/links - the caller's links, newest first
pub async fn list_links(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<Vec<LinkSummary>>, ApiError> {
    require_read(&session)?;
    Ok(Json(
        state
            .issuer
            .list_links_for_principal(&session.principal)
            .await?,
    ))
}

/// DELETE /api/links/{token}
pub async fn revoke_link(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    Path(token): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_write(&session)?;
    state.issuer.revoke(&session.principal, &token).await?;
    Ok(StatusCode::NO_CONTENT)
}
