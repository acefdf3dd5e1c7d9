//! In-memory object client
//!
//! Stands in for the network-backed client in tests. Objects live in a map keyed
//! by bucket and key; every call is counted and failures can be injected.

use std::collections::HashMap;
use std::io::{self, Cursor};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::client::{ClientResult, ObjectClient, PutObject, StoredObject};

#[derive(Debug, Clone)]
struct MemoryObject {
    data: Bytes,
    content_type: Option<String>,
    metadata: HashMap<String, String>,
}

/// In-memory [`ObjectClient`]
#[derive(Debug, Default)]
pub struct MemoryObjectClient {
    objects: RwLock<HashMap<(String, String), MemoryObject>>,
    requests: AtomicUsize,
    failure: RwLock<Option<String>>,
}

impl MemoryObjectClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls made against this client, successful or not.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Make every following call fail with `message` until [`recover`](Self::recover).
    pub async fn fail_requests(&self, message: impl Into<String>) {
        *self.failure.write().await = Some(message.into());
    }

    pub async fn recover(&self) {
        *self.failure.write().await = None;
    }

    pub async fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .read()
            .await
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    async fn begin_request(&self) -> io::Result<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        match self.failure.read().await.as_ref() {
            Some(message) => Err(io::Error::other(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ObjectClient for MemoryObjectClient {
    async fn put_object(&self, request: PutObject) -> ClientResult<()> {
        self.begin_request().await?;

        // S3 rejects uploads whose declared length disagrees with the body
        if let Some(declared) = request.content_length {
            if declared != request.body.len() as i64 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "declared content length {} does not match body length {}",
                        declared,
                        request.body.len()
                    ),
                )
                .into());
            }
        }

        let object = MemoryObject {
            data: request.body,
            content_type: request.content_type,
            metadata: request.metadata.unwrap_or_default(),
        };
        self.objects
            .write()
            .await
            .insert((request.bucket, request.key), object);

        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> ClientResult<Option<StoredObject>> {
        self.begin_request().await?;

        let objects = self.objects.read().await;
        let Some(object) = objects.get(&(bucket.to_string(), key.to_string())) else {
            return Ok(None);
        };

        Ok(Some(StoredObject {
            body: Box::pin(Cursor::new(object.data.clone())),
            content_type: object.content_type.clone(),
            content_length: Some(object.data.len() as i64),
            metadata: object.metadata.clone(),
        }))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> ClientResult<()> {
        self.begin_request().await?;

        self.objects
            .write()
            .await
            .remove(&(bucket.to_string(), key.to_string()));

        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_at: DateTime<Utc>,
    ) -> ClientResult<String> {
        self.begin_request().await?;

        Ok(format!(
            "memory://{}/{}?expires={}",
            bucket,
            key,
            expires_at.timestamp()
        ))
    }
}
