//! Educational materials: upload, listing, download and processing status.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use database::material::{self, NewMaterial, Viewer};
use database::{Material, MaterialCategory, ProcessingStatus};
use serde::Deserialize;
use tracing::{info, warn};

use crate::auth::AuthUser;
use crate::error::{ApiError, Result};
use crate::state::AppState;
use crate::upload::{spool_field, SpooledFile};

#[derive(Deserialize, Default)]
pub struct ListMaterialsQuery {
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: ProcessingStatus,
    #[serde(default)]
    pub content_text: Option<String>,
}

fn viewer(auth: &AuthUser) -> Viewer<'_> {
    Viewer {
        user_id: auth.id(),
        is_admin: auth.is_admin(),
    }
}

pub async fn list_materials(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListMaterialsQuery>,
) -> Result<Json<Vec<Material>>> {
    let category = query
        .category
        .as_deref()
        .map(|c| c.parse::<MaterialCategory>())
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let materials =
        material::list_materials(state.db.pool(), auth.company_id(), viewer(&auth), category)
            .await?;
    Ok(Json(materials))
}

/// Upload a material.
///
/// Multipart fields: `file` (required), `title` (defaults to the file name),
/// `description`, `category` (default `OTHER`), `tags` (comma separated) and
/// `is_public` (default `true`).
pub async fn create_material(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Material>)> {
    let mut file: Option<SpooledFile> = None;
    let mut title = None;
    let mut description = None;
    let mut category = MaterialCategory::Other;
    let mut tags = Vec::new();
    let mut is_public = true;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            file = Some(spool_field(field).await?);
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Invalid field {}: {}", name, e)))?;
        let value = value.trim().to_string();
        match name.as_str() {
            "title" if !value.is_empty() => title = Some(value),
            "description" if !value.is_empty() => description = Some(value),
            "category" if !value.is_empty() => {
                category = value
                    .parse()
                    .map_err(|e: database::error::UnknownVariant| ApiError::BadRequest(e.to_string()))?;
            }
            "tags" => {
                tags = value
                    .split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "is_public" => is_public = !matches!(value.as_str(), "false" | "0" | "off"),
            _ => {}
        }
    }

    let file = file.ok_or_else(|| ApiError::BadRequest("Missing file field".to_string()))?;
    let uploaded = state
        .materials
        .upload(
            file.temp.path(),
            &file.file_name,
            &file.content_type,
            auth.company_id(),
        )
        .await?;

    let record = NewMaterial {
        company_id: auth.company_id().to_string(),
        title: title.unwrap_or_else(|| file.file_name.clone()),
        description,
        category,
        tags,
        author_id: auth.id().to_string(),
        author_name: auth.0.name.clone(),
        file_url: uploaded.url.clone(),
        file_name: uploaded.original_name.clone(),
        file_size: i64::try_from(file.size).unwrap_or(i64::MAX),
        file_type: uploaded.content_type.clone(),
        object_name: uploaded.object_name.clone(),
        is_public,
    };

    match material::create_material(state.db.pool(), &record).await {
        Ok(created) => {
            info!(material_id = %created.id, object = %created.object_name, "Material uploaded");
            Ok((StatusCode::CREATED, Json(created)))
        }
        Err(e) => {
            if let Err(cleanup) = state.materials.remove(&uploaded.object_name).await {
                warn!(object = %uploaded.object_name, "Orphaned upload left behind: {}", cleanup);
            }
            Err(e.into())
        }
    }
}

pub async fn get_material(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Material>> {
    let found =
        material::get_material(state.db.pool(), auth.company_id(), &id, viewer(&auth)).await?;
    Ok(Json(found))
}

/// Delete a material and its stored object. Admin only.
pub async fn delete_material(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    auth.require_admin()?;

    let found =
        material::get_material(state.db.pool(), auth.company_id(), &id, viewer(&auth)).await?;
    state.materials.remove(&found.object_name).await?;
    material::delete_material(state.db.pool(), auth.company_id(), &id).await?;

    info!(material_id = %id, deleted_by = %auth.id(), "Material deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Stream a material's bytes back as an attachment.
pub async fn download_material(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let found =
        material::get_material(state.db.pool(), auth.company_id(), &id, viewer(&auth)).await?;
    let data = state.materials.fetch(&found.object_name).await?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        found.file_name.replace(['"', '\\', '\r', '\n'], "_")
    );
    Ok(([(CONTENT_TYPE, found.file_type), (CONTENT_DISPOSITION, disposition)], data))
}

/// Advance the processing status. Called by the indexing collaborator; admin only.
pub async fn advance_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Material>> {
    auth.require_admin()?;

    let updated = material::advance_status(
        state.db.pool(),
        auth.company_id(),
        &id,
        req.status,
        req.content_text.as_deref(),
    )
    .await?;

    info!(material_id = %id, status = %updated.processing_status, "Material status advanced");
    Ok(Json(updated))
}
