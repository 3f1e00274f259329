//! The ObjectStore trait definition.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

/// The subset of the S3 API the adapter relies on.
///
/// This trait is object-safe and can be used with `Arc<dyn ObjectStore>`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StoreError>;

    async fn make_bucket(&self, bucket: &str, region: &str) -> Result<(), StoreError>;

    /// Replace the bucket policy with the given JSON document.
    async fn set_bucket_policy(&self, bucket: &str, policy: &str) -> Result<(), StoreError>;

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<(), StoreError>;

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Delete an object. Deleting a missing object succeeds.
    async fn remove_object(&self, bucket: &str, key: &str) -> Result<(), StoreError>;

    /// Issue a GET URL valid for `expires`.
    async fn presigned_get_object(
        &self,
        bucket: &str,
        key: &str,
        expires: Duration,
    ) -> Result<String, StoreError>;
}
