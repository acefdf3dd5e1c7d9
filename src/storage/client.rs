//! Provider client capability
//!
//! The narrow set of calls [`S3CloudStorage`](super::s3::S3CloudStorage) needs
//! from an object-store client. The AWS SDK backs it in production and
//! [`MemoryObjectClient`](super::memory::MemoryObjectClient) backs it in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use super::FileBody;
use crate::error::BoxError;

/// Result of a raw provider call. Errors are passed through untouched so the
/// caller can keep them as the cause of a storage error.
pub type ClientResult<T> = std::result::Result<T, BoxError>;

/// Object upload request.
#[derive(Debug, Clone)]
pub struct PutObject {
    pub bucket: String,
    pub key: String,
    pub body: Bytes,
    pub content_type: Option<String>,
    pub content_length: Option<i64>,
    pub metadata: Option<HashMap<String, String>>,
}

/// Object returned by the provider, body still unread.
pub struct StoredObject {
    pub body: FileBody,
    pub content_type: Option<String>,
    pub content_length: Option<i64>,
    pub metadata: HashMap<String, String>,
}

#[async_trait]
pub trait ObjectClient: Send + Sync {
    async fn put_object(&self, request: PutObject) -> ClientResult<()>;

    /// `Ok(None)` when the provider has no object under `bucket`/`key`.
    async fn get_object(&self, bucket: &str, key: &str) -> ClientResult<Option<StoredObject>>;

    async fn delete_object(&self, bucket: &str, key: &str) -> ClientResult<()>;

    /// Presigned GET URL valid until `expires_at`.
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_at: DateTime<Utc>,
    ) -> ClientResult<String>;
}
