//! Fetched file payload

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use tokio::io::AsyncReadExt;

use super::FileBody;
use crate::{Error, Result};

/// Metadata key conventionally used to tag a stored file with its owner.
pub const USER_ID_METADATA_KEY: &str = "userid";

/// Upper bound on the buffer reserved from a provider-reported length.
const MAX_PREALLOCATED_BYTES: u64 = 8 * 1024 * 1024;

/// A file returned by [`CloudStorage::fetch`](super::CloudStorage::fetch).
///
/// The body wraps a live provider connection. Read it to the end or drop the
/// payload promptly; the connection is not returned to the client's pool until
/// one of the two happens.
pub struct CloudFile {
    body: FileBody,
    content_length: Option<u64>,
    content_type: Option<String>,
    metadata: HashMap<String, String>,
}

impl CloudFile {
    /// Build a payload in one step. Non-positive lengths are recorded as unknown.
    pub fn new(
        body: FileBody,
        content_length: Option<i64>,
        content_type: Option<String>,
        metadata: HashMap<String, String>,
    ) -> Self {
        Self {
            body,
            content_length: content_length
                .filter(|len| *len > 0)
                .map(|len| len as u64),
            content_type,
            metadata,
        }
    }

    /// Content length in bytes, `None` when the provider did not report one.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    pub fn user_id(&self) -> Option<&str> {
        self.metadata.get(USER_ID_METADATA_KEY).map(String::as_str)
    }

    /// Take ownership of the byte stream.
    pub fn into_body(self) -> FileBody {
        self.body
    }

    /// Read the whole body into memory, releasing the connection.
    pub async fn into_bytes(self) -> Result<Bytes> {
        let mut body = self.body;
        let reserve = self
            .content_length
            .unwrap_or(0)
            .min(MAX_PREALLOCATED_BYTES) as usize;
        let mut buf = Vec::with_capacity(reserve);
        body.read_to_end(&mut buf)
            .await
            .map_err(|e| Error::storage_with("Error reading file body", e))?;
        Ok(Bytes::from(buf))
    }
}

impl fmt::Debug for CloudFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudFile")
            .field("content_length", &self.content_length)
            .field("content_type", &self.content_type)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}
