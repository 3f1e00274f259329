//! Direct access to exam documents by key.
//!
//! Only objects referenced from one of the caller's plan exams are reachable
//! here. Materials go through their own routes, which check visibility.

use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use database::plan;
use object_storage::{belongs_to_tenant, DEFAULT_PRESIGN_TTL};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::auth::AuthUser;
use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Longest lifetime a caller may ask for, seven days.
const MAX_TTL_SECS: u64 = 7 * 24 * 3600;

#[derive(Deserialize)]
pub struct FileQuery {
    pub key: String,
    /// URL lifetime in seconds.
    #[serde(default)]
    pub ttl: Option<u64>,
}

/// Keys outside the caller's tenant, or not attached to any exam, look like
/// missing files.
async fn check_key(state: &AppState, auth: &AuthUser, key: &str) -> Result<()> {
    if belongs_to_tenant(key, auth.company_id())
        && plan::has_exam_file(state.db.pool(), auth.company_id(), key).await?
    {
        Ok(())
    } else {
        Err(ApiError::NotFound("File".to_string()))
    }
}

/// Issue a fresh read URL for an exam document.
pub async fn file_url(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<FileQuery>,
) -> Result<Json<serde_json::Value>> {
    check_key(&state, &auth, &query.key).await?;

    let ttl = query
        .ttl
        .map(|secs| Duration::from_secs(secs.clamp(1, MAX_TTL_SECS)))
        .unwrap_or(DEFAULT_PRESIGN_TTL);
    let url = state.documents.presigned_url(&query.key, Some(ttl)).await?;

    Ok(Json(json!({ "url": url, "expires_in": ttl.as_secs() })))
}

/// Detach an exam document from its plan, then delete the object.
pub async fn delete_file(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<FileQuery>,
) -> Result<StatusCode> {
    if !belongs_to_tenant(&query.key, auth.company_id())
        || !plan::detach_file(state.db.pool(), auth.company_id(), &query.key).await?
    {
        return Err(ApiError::NotFound("File".to_string()));
    }

    state.documents.remove(&query.key).await?;
    info!(object = %query.key, user_id = %auth.id(), "Exam file deleted");

    Ok(StatusCode::NO_CONTENT)
}
