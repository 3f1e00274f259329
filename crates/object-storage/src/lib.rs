//! Object storage for uploaded exam files and educational materials.
//!
//! [`StorageAdapter`] is bound to one bucket and owns its lifecycle: it
//! creates the bucket when missing, applies the bucket's access policy,
//! generates collision-resistant keys under a tenant prefix and hands out
//! presigned read URLs.
//!
//! The wire protocol sits behind [`ObjectStore`]:
//!
//! - [`S3ObjectStore`] - any S3-compatible service (AWS, MinIO, ...)
//! - [`MemoryObjectStore`] - in-process buckets for tests and local runs
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use object_storage::{BucketPolicy, MemoryObjectStore, StorageAdapter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), object_storage::StorageError> {
//!     let store = Arc::new(MemoryObjectStore::new());
//!     let documents = StorageAdapter::new(store, "plan-documents", "us-east-1", BucketPolicy::PublicRead);
//!     documents.ensure_bucket().await?;
//!     assert!(documents.is_ready());
//!     Ok(())
//! }
//! ```

mod adapter;
mod error;
mod memory;
mod naming;
mod policy;
mod s3;
mod store;

pub use adapter::{StorageAdapter, UploadedObject, DEFAULT_PRESIGN_TTL, UPLOAD_URL_TTL};
pub use error::{StorageError, StoreError};
pub use memory::MemoryObjectStore;
pub use naming::{belongs_to_tenant, slugify, unique_object_name};
pub use policy::BucketPolicy;
pub use s3::{S3Config, S3ObjectStore};
pub use store::ObjectStore;
