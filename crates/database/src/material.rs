//! Educational material persistence.

use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{Material, MaterialCategory, ProcessingStatus};
use crate::validation::{validate_tags, validate_title};

const MATERIAL_COLUMNS: &str = "id, company_id, title, description, category, tags, author_id, \
     author_name, file_url, file_name, file_size, file_type, object_name, content_text, \
     processing_status, is_public, created_at, updated_at";

/// Fields for a freshly uploaded material. Starts as `PENDING`.
#[derive(Debug, Clone)]
pub struct NewMaterial {
    pub company_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: MaterialCategory,
    pub tags: Vec<String>,
    pub author_id: String,
    pub author_name: String,
    pub file_url: String,
    pub file_name: String,
    pub file_size: i64,
    pub file_type: String,
    pub object_name: String,
    pub is_public: bool,
}

/// Who is looking at materials.
#[derive(Debug, Clone, Copy)]
pub struct Viewer<'a> {
    pub user_id: &'a str,
    pub is_admin: bool,
}

/// Insert a material record.
pub async fn create_material(pool: &SqlitePool, material: &NewMaterial) -> Result<Material> {
    validate_title("title", &material.title)?;
    validate_tags(&material.tags)?;
    let id = uuid::Uuid::new_v4().to_string();
    let tags: Vec<String> = material.tags.iter().map(|t| t.trim().to_string()).collect();

    sqlx::query(
        r#"
        INSERT INTO materials (
            id, company_id, title, description, category, tags, author_id, author_name,
            file_url, file_name, file_size, file_type, object_name, processing_status, is_public
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&material.company_id)
    .bind(material.title.trim())
    .bind(&material.description)
    .bind(material.category.as_str())
    .bind(Json(&tags))
    .bind(&material.author_id)
    .bind(&material.author_name)
    .bind(&material.file_url)
    .bind(&material.file_name)
    .bind(material.file_size)
    .bind(&material.file_type)
    .bind(&material.object_name)
    .bind(ProcessingStatus::Pending.as_str())
    .bind(material.is_public)
    .execute(pool)
    .await?;

    get_material_unchecked(pool, &material.company_id, &id).await
}

/// Get a material the viewer is allowed to see.
pub async fn get_material(
    pool: &SqlitePool,
    company_id: &str,
    id: &str,
    viewer: Viewer<'_>,
) -> Result<Material> {
    let material = get_material_unchecked(pool, company_id, id).await?;

    if !is_visible(&material, viewer) {
        return Err(DatabaseError::NotFound {
            entity: "Material",
            id: id.to_string(),
        });
    }

    Ok(material)
}

/// List materials visible to the viewer, newest first.
pub async fn list_materials(
    pool: &SqlitePool,
    company_id: &str,
    viewer: Viewer<'_>,
    category: Option<MaterialCategory>,
) -> Result<Vec<Material>> {
    let rows = match category {
        Some(category) => {
            sqlx::query_as::<_, Material>(&format!(
                "SELECT {MATERIAL_COLUMNS} FROM materials WHERE company_id = ? AND category = ? \
                 ORDER BY created_at DESC"
            ))
            .bind(company_id)
            .bind(category.as_str())
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Material>(&format!(
                "SELECT {MATERIAL_COLUMNS} FROM materials WHERE company_id = ? \
                 ORDER BY created_at DESC"
            ))
            .bind(company_id)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows.into_iter().filter(|m| is_visible(m, viewer)).collect())
}

/// Advance the processing status, optionally storing extracted text.
///
/// Status only moves forward; see [`ProcessingStatus::can_advance_to`].
pub async fn advance_status(
    pool: &SqlitePool,
    company_id: &str,
    id: &str,
    next: ProcessingStatus,
    content_text: Option<&str>,
) -> Result<Material> {
    let material = get_material_unchecked(pool, company_id, id).await?;

    if !material.processing_status.can_advance_to(next) {
        return Err(DatabaseError::InvalidTransition {
            entity: "Material",
            from: material.processing_status.to_string(),
            to: next.to_string(),
        });
    }

    let result = sqlx::query(
        r#"
        UPDATE materials
        SET processing_status = ?, content_text = COALESCE(?, content_text),
            updated_at = datetime('now')
        WHERE id = ? AND company_id = ? AND processing_status = ?
        "#,
    )
    .bind(next.as_str())
    .bind(content_text)
    .bind(id)
    .bind(company_id)
    .bind(material.processing_status.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        let current = get_material_unchecked(pool, company_id, id).await?;
        return Err(DatabaseError::InvalidTransition {
            entity: "Material",
            from: current.processing_status.to_string(),
            to: next.to_string(),
        });
    }

    get_material_unchecked(pool, company_id, id).await
}

/// Delete a material record and return it so the caller can remove its object.
pub async fn delete_material(pool: &SqlitePool, company_id: &str, id: &str) -> Result<Material> {
    let material = get_material_unchecked(pool, company_id, id).await?;

    sqlx::query(
        r#"
        DELETE FROM materials
        WHERE id = ? AND company_id = ?
        "#,
    )
    .bind(id)
    .bind(company_id)
    .execute(pool)
    .await?;

    Ok(material)
}

/// Count materials of a company.
pub async fn count_materials(pool: &SqlitePool, company_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM materials WHERE company_id = ?
        "#,
    )
    .bind(company_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

async fn get_material_unchecked(pool: &SqlitePool, company_id: &str, id: &str) -> Result<Material> {
    sqlx::query_as::<_, Material>(&format!(
        "SELECT {MATERIAL_COLUMNS} FROM materials WHERE id = ? AND company_id = ?"
    ))
    .bind(id)
    .bind(company_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Material",
        id: id.to_string(),
    })
}

fn is_visible(material: &Material, viewer: Viewer<'_>) -> bool {
    material.is_public || viewer.is_admin || material.author_id == viewer.user_id
}
