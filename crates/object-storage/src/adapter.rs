//! Per-bucket storage adapter.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::error::{StorageError, StoreError};
use crate::naming::unique_object_name;
use crate::policy::BucketPolicy;
use crate::store::ObjectStore;

/// Lifetime of URLs handed out by [`StorageAdapter::presigned_url`] by default.
pub const DEFAULT_PRESIGN_TTL: Duration = Duration::from_secs(3600);

/// Lifetime of the URL returned with a fresh upload.
pub const UPLOAD_URL_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// Reference to an object written by [`StorageAdapter::upload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedObject {
    /// Full key, `tenant_id/unique_name`.
    pub object_name: String,
    pub original_name: String,
    pub size: u64,
    pub content_type: String,
    pub url: String,
}

/// Storage operations bound to one bucket.
pub struct StorageAdapter {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    region: String,
    policy: BucketPolicy,
    ready: AtomicBool,
}

impl StorageAdapter {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        region: impl Into<String>,
        policy: BucketPolicy,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            region: region.into(),
            policy,
            ready: AtomicBool::new(false),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Whether [`ensure_bucket`](Self::ensure_bucket) has succeeded.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Create the bucket if it does not exist, then apply its policy.
    ///
    /// Safe to call repeatedly. Uploads are refused until this succeeds once.
    pub async fn ensure_bucket(&self) -> Result<(), StorageError> {
        let init = |reason: StoreError| StorageError::Init {
            bucket: self.bucket.clone(),
            reason: reason.to_string(),
        };

        let exists = self.store.bucket_exists(&self.bucket).await.map_err(init)?;
        if !exists {
            self.store
                .make_bucket(&self.bucket, &self.region)
                .await
                .map_err(init)?;
            info!(bucket = %self.bucket, region = %self.region, "Bucket created");
        }

        if let Some(document) = self.policy.document(&self.bucket) {
            self.store
                .set_bucket_policy(&self.bucket, &document)
                .await
                .map_err(init)?;
        }

        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Upload a local file under `tenant_id/` and return a 7-day read URL.
    pub async fn upload(
        &self,
        local_path: &Path,
        original_name: &str,
        content_type: &str,
        tenant_id: &str,
    ) -> Result<UploadedObject, StorageError> {
        let fail = |reason: String| {
            error!(bucket = %self.bucket, file = %original_name, "Upload failed: {}", reason);
            StorageError::Upload {
                name: original_name.to_string(),
                reason,
            }
        };

        if !self.is_ready() {
            return Err(StorageError::Init {
                bucket: self.bucket.clone(),
                reason: "bucket not initialized".to_string(),
            });
        }
        if tenant_id.is_empty() || tenant_id.contains('/') {
            return Err(fail(format!("invalid tenant id {:?}", tenant_id)));
        }

        let data = tokio::fs::read(local_path)
            .await
            .map_err(|e| fail(format!("reading {}: {}", local_path.display(), e)))?;
        let size = data.len() as u64;
        let object_name = format!("{}/{}", tenant_id, unique_object_name(original_name));

        let mut metadata = HashMap::new();
        metadata.insert("original-name".to_string(), header_safe(original_name));
        metadata.insert("tenant-id".to_string(), tenant_id.to_string());

        self.store
            .put_object(&self.bucket, &object_name, data, content_type, &metadata)
            .await
            .map_err(|e| fail(e.to_string()))?;

        let url = self
            .store
            .presigned_get_object(&self.bucket, &object_name, UPLOAD_URL_TTL)
            .await
            .map_err(|e| fail(e.to_string()))?;

        info!(bucket = %self.bucket, object = %object_name, size, "Object uploaded");

        Ok(UploadedObject {
            object_name,
            original_name: original_name.to_string(),
            size,
            content_type: content_type.to_string(),
            url,
        })
    }

    /// Issue a read URL for an object, valid for `ttl` (default one hour).
    pub async fn presigned_url(
        &self,
        object_name: &str,
        ttl: Option<Duration>,
    ) -> Result<String, StorageError> {
        self.store
            .presigned_get_object(&self.bucket, object_name, ttl.unwrap_or(DEFAULT_PRESIGN_TTL))
            .await
            .map_err(|e| {
                error!(bucket = %self.bucket, object = %object_name, "Presign failed: {}", e);
                StorageError::Presign {
                    key: object_name.to_string(),
                    reason: e.to_string(),
                }
            })
    }

    /// Delete an object. Removing an object that is already gone succeeds.
    pub async fn remove(&self, object_name: &str) -> Result<(), StorageError> {
        match self.store.remove_object(&self.bucket, object_name).await {
            Ok(()) => Ok(()),
            Err(StoreError::NoSuchKey { .. }) => {
                warn!(bucket = %self.bucket, object = %object_name, "Object already absent");
                Ok(())
            }
            Err(e) => {
                error!(bucket = %self.bucket, object = %object_name, "Delete failed: {}", e);
                Err(StorageError::Delete {
                    key: object_name.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Fetch an object's bytes.
    pub async fn fetch(&self, object_name: &str) -> Result<Vec<u8>, StorageError> {
        self.store
            .get_object(&self.bucket, object_name)
            .await
            .map_err(|e| {
                error!(bucket = %self.bucket, object = %object_name, "Download failed: {}", e);
                StorageError::Download {
                    key: object_name.to_string(),
                    reason: e.to_string(),
                }
            })
    }

    /// Fetch an object into a local file.
    pub async fn download(&self, object_name: &str, destination: &Path) -> Result<(), StorageError> {
        let data = self.fetch(object_name).await?;
        tokio::fs::write(destination, data)
            .await
            .map_err(|e| StorageError::Download {
                key: object_name.to_string(),
                reason: format!("writing {}: {}", destination.display(), e),
            })
    }
}

/// Object metadata travels as HTTP headers, which only carry ASCII.
fn header_safe(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryObjectStore;

    fn adapter(store: Arc<MemoryObjectStore>, policy: BucketPolicy) -> StorageAdapter {
        StorageAdapter::new(store, "plan-documents", "us-east-1", policy)
    }

    #[tokio::test]
    async fn test_ensure_bucket_is_idempotent() {
        let store = Arc::new(MemoryObjectStore::new());
        let documents = adapter(store.clone(), BucketPolicy::EmailDomain("clinic.com".into()));
        assert!(!documents.is_ready());

        documents.ensure_bucket().await.unwrap();
        documents.ensure_bucket().await.unwrap();

        assert!(documents.is_ready());
        let policy = store.policy("plan-documents").await.unwrap();
        assert!(policy.contains("*@clinic.com"));
    }

    #[tokio::test]
    async fn test_upload_requires_ready_bucket() {
        let store = Arc::new(MemoryObjectStore::new());
        let documents = adapter(store, BucketPolicy::PublicRead);
        let file = tempfile::NamedTempFile::new().unwrap();

        let err = documents
            .upload(file.path(), "exam.pdf", "application/pdf", "company-1")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Init { .. }));
    }

    #[tokio::test]
    async fn test_upload_round_trip() {
        let store = Arc::new(MemoryObjectStore::new());
        let documents = adapter(store.clone(), BucketPolicy::PublicRead);
        documents.ensure_bucket().await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("upload.tmp");
        tokio::fs::write(&source, b"%PDF-1.4 thyroid panel").await.unwrap();

        let uploaded = documents
            .upload(&source, "Painel Tireoide.pdf", "application/pdf", "company-1")
            .await
            .unwrap();

        assert!(uploaded.object_name.starts_with("company-1/painel-tireoide-"));
        assert!(uploaded.object_name.ends_with(".pdf"));
        assert_eq!(uploaded.size, 22);
        assert!(uploaded.url.contains("expires=604800"));

        let (content_type, metadata) = store
            .object_info("plan-documents", &uploaded.object_name)
            .await
            .unwrap();
        assert_eq!(content_type, "application/pdf");
        assert_eq!(metadata["original-name"], "Painel Tireoide.pdf");
        assert_eq!(metadata["tenant-id"], "company-1");

        let target = dir.path().join("copy.pdf");
        documents.download(&uploaded.object_name, &target).await.unwrap();
        assert_eq!(tokio::fs::read(&target).await.unwrap(), b"%PDF-1.4 thyroid panel");

        let url = documents.presigned_url(&uploaded.object_name, None).await.unwrap();
        assert!(url.ends_with("expires=3600"));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let store = Arc::new(MemoryObjectStore::new());
        let documents = adapter(store.clone(), BucketPolicy::Private);
        documents.ensure_bucket().await.unwrap();

        let file = tempfile::NamedTempFile::new().unwrap();
        let uploaded = documents
            .upload(file.path(), "empty.txt", "text/plain", "company-1")
            .await
            .unwrap();

        documents.remove(&uploaded.object_name).await.unwrap();
        documents.remove(&uploaded.object_name).await.unwrap();
        assert_eq!(store.object_count("plan-documents").await, 0);

        let err = documents.fetch(&uploaded.object_name).await.unwrap_err();
        assert_eq!(err.class(), "DownloadError");
    }

    #[tokio::test]
    async fn test_upload_of_missing_file_fails() {
        let store = Arc::new(MemoryObjectStore::new());
        let documents = adapter(store, BucketPolicy::PublicRead);
        documents.ensure_bucket().await.unwrap();

        let err = documents
            .upload(Path::new("/nonexistent/exam.pdf"), "exam.pdf", "application/pdf", "c1")
            .await
            .unwrap_err();
        assert_eq!(err.class(), "UploadError");
    }

    #[test]
    fn test_header_safe() {
        assert_eq!(header_safe("Exame Sanguíneo.pdf"), "Exame Sangu_neo.pdf");
    }
}
