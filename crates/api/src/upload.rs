//! Spooling multipart file fields to disk before they go to object storage.

use axum::extract::multipart::Field;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use crate::error::{ApiError, Result};

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// A file field written to a temporary file. The file is removed on drop.
pub struct SpooledFile {
    pub temp: NamedTempFile,
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
}

/// Stream a multipart file field into a temporary file, chunk by chunk.
///
/// The content type falls back to a guess from the file name when the client
/// sent none.
pub async fn spool_field(mut field: Field<'_>) -> Result<SpooledFile> {
    let file_name = field
        .file_name()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::BadRequest("File field has no file name".to_string()))?;

    let content_type = field
        .content_type()
        .map(str::to_string)
        .unwrap_or_else(|| {
            mime_guess::from_path(&file_name)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        });

    let temp = NamedTempFile::new()
        .map_err(|e| ApiError::Internal(format!("Failed to create temp file: {}", e)))?;
    let mut file = tokio::fs::File::create(temp.path())
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to create temp file: {}", e)))?;

    let mut size = 0u64;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?
    {
        size += chunk.len() as u64;
        if size > MAX_UPLOAD_BYTES as u64 {
            return Err(ApiError::BadRequest(format!(
                "Uploaded file exceeds {} bytes",
                MAX_UPLOAD_BYTES
            )));
        }
        file.write_all(&chunk)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to spool upload: {}", e)))?;
    }
    file.flush()
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to spool upload: {}", e)))?;

    if size == 0 {
        return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
    }

    Ok(SpooledFile {
        temp,
        file_name,
        content_type,
        size,
    })
}
