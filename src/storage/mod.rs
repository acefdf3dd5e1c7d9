//! Storage abstraction layer
//!
//! Provides a provider-agnostic interface for storing, fetching, deleting and
//! signing expiring URLs for files addressed by location identifiers.

use std::collections::HashMap;
use std::pin::Pin;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::Result;

pub mod client;
pub mod file;
pub mod location;
pub mod memory;
pub mod s3;

pub use client::{ObjectClient, PutObject, StoredObject};
pub use file::{CloudFile, USER_ID_METADATA_KEY};
pub use location::Location;
pub use memory::MemoryObjectClient;
pub use s3::{AwsObjectClient, S3CloudStorage, S3CloudStorageBuilder};

/// Readable-once byte stream. Exclusively owned by whoever holds it.
pub type FileBody = Pin<Box<dyn AsyncRead + Send>>;

/// Optional attributes attached to a stored file.
///
/// A non-positive `content_length` is treated as unset.
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    pub content_type: Option<String>,
    pub content_length: Option<i64>,
    pub metadata: Option<HashMap<String, String>>,
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn content_length(mut self, content_length: i64) -> Self {
        self.content_length = Some(content_length);
        self
    }

    pub fn metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Cloud file storage
#[async_trait]
pub trait CloudStorage: Send + Sync {
    /// Split a location identifier into region, bucket and key
    fn parse_location(&self, uri: &str) -> Result<Location>;

    /// Upload `body` under `bucket`/`key` and return its location identifier
    async fn store(
        &self,
        bucket: &str,
        key: &str,
        body: FileBody,
        options: StoreOptions,
    ) -> Result<String>;

    /// Fetch a file by location identifier.
    ///
    /// The returned body holds a provider connection open until it is fully read
    /// or dropped.
    async fn fetch(&self, uri: &str) -> Result<CloudFile>;

    /// Delete a file by location identifier
    async fn delete(&self, uri: &str) -> Result<()>;

    /// Create a GET URL for the file that expires `expiry_secs` from now
    async fn sign_url(&self, uri: &str, expiry_secs: i64) -> Result<String>;
}
