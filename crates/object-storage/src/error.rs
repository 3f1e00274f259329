//! Storage error types.

use thiserror::Error;

/// Failures reported by an [`ObjectStore`](crate::ObjectStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("bucket not found: {0}")]
    NoSuchBucket(String),

    #[error("object not found: {bucket}/{key}")]
    NoSuchKey { bucket: String, key: String },

    /// Anything the backend reported that is not a missing resource.
    #[error("{0}")]
    Backend(String),
}

/// Errors surfaced by [`StorageAdapter`](crate::StorageAdapter), named after
/// the operation that failed.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Bucket creation or policy assignment failed, or the bucket was never
    /// initialized.
    #[error("storage init failed for bucket {bucket}: {reason}")]
    Init { bucket: String, reason: String },

    #[error("upload failed for {name}: {reason}")]
    Upload { name: String, reason: String },

    #[error("download failed for {key}: {reason}")]
    Download { key: String, reason: String },

    #[error("delete failed for {key}: {reason}")]
    Delete { key: String, reason: String },

    #[error("could not presign {key}: {reason}")]
    Presign { key: String, reason: String },
}

impl StorageError {
    /// Short, stable name of the failure class.
    pub fn class(&self) -> &'static str {
        match self {
            StorageError::Init { .. } => "StorageInitError",
            StorageError::Upload { .. } => "UploadError",
            StorageError::Download { .. } => "DownloadError",
            StorageError::Delete { .. } => "DeleteError",
            StorageError::Presign { .. } => "PresignError",
        }
    }
}
