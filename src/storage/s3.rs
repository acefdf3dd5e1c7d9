//! S3 storage backend

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::io::AsyncReadExt;

use super::client::{ClientResult, ObjectClient, PutObject, StoredObject};
use super::{CloudFile, CloudStorage, FileBody, Location, StoreOptions};
use crate::{Error, Result};

/// [`ObjectClient`] backed by the AWS SDK.
#[derive(Clone, Debug)]
pub struct AwsObjectClient {
    client: Client,
}

impl AwsObjectClient {
    /// Build a client pinned to `region`. No network traffic happens here.
    pub fn new(
        credentials: SharedCredentialsProvider,
        region: impl Into<String>,
        endpoint: Option<String>,
    ) -> Self {
        let mut s3_config_builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.into()))
            .credentials_provider(credentials);

        if let Some(endpoint_url) = endpoint {
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint_url)
                .force_path_style(true);
        }

        Self {
            client: Client::from_conf(s3_config_builder.build()),
        }
    }
}

#[async_trait]
impl ObjectClient for AwsObjectClient {
    async fn put_object(&self, request: PutObject) -> ClientResult<()> {
        self.client
            .put_object()
            .bucket(request.bucket)
            .key(request.key)
            .body(ByteStream::from(request.body))
            .set_content_type(request.content_type)
            .set_content_length(request.content_length)
            .set_metadata(request.metadata)
            .send()
            .await?;

        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> ClientResult<Option<StoredObject>> {
        let response = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(response) => response,
            Err(err) => {
                if err.as_service_error().is_some_and(|e| e.is_no_such_key()) {
                    return Ok(None);
                }
                return Err(err.into());
            }
        };

        let content_type = response.content_type().map(str::to_string);
        let content_length = response.content_length();
        let metadata = response.metadata().cloned().unwrap_or_default();
        let body: FileBody = Box::pin(response.body.into_async_read());

        Ok(Some(StoredObject {
            body,
            content_type,
            content_length,
            metadata,
        }))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> ClientResult<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await?;

        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_at: DateTime<Utc>,
    ) -> ClientResult<String> {
        let start = Utc::now();
        let remaining = (expires_at - start).to_std()?;
        // SigV4 only carries whole seconds.
        let expires_in =
            Duration::from_secs(remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0));

        let presigning_config = PresigningConfig::builder()
            .start_time(start.into())
            .expires_in(expires_in)
            .build()?;

        let presigned = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning_config)
            .await?;

        Ok(presigned.uri().to_string())
    }
}

/// File storage on AWS S3, bound to a single region.
///
/// Object CRUD and URL signing go through separate clients so that URLs can be
/// signed with credentials that differ from the ones used to write objects.
#[derive(Clone)]
pub struct S3CloudStorage {
    client: Arc<dyn ObjectClient>,
    signer: Arc<dyn ObjectClient>,
    region: String,
}

impl S3CloudStorage {
    pub fn builder() -> S3CloudStorageBuilder {
        S3CloudStorageBuilder::default()
    }

    /// Wire the storage to already-built clients.
    pub fn with_clients(
        client: Arc<dyn ObjectClient>,
        signer: Arc<dyn ObjectClient>,
        region: impl Into<String>,
    ) -> Result<Self> {
        let region = region.into();
        require_region(&region)?;

        Ok(Self {
            client,
            signer,
            region,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Parse `uri` and make sure it points into this storage's region.
    fn locate(&self, uri: &str) -> Result<Location> {
        let location = Location::parse(uri)?;
        if !location.is_in_region(&self.region) {
            return Err(Error::invalid_argument(format!(
                "file uri {} not same as this storage region {}",
                uri, self.region
            )));
        }
        Ok(location)
    }

    /// Fetch a file by bucket and key. No region check is made.
    pub async fn fetch_object(&self, bucket: &str, key: &str) -> Result<CloudFile> {
        require_non_empty("bucket", bucket)?;
        require_non_empty("key", key)?;

        tracing::debug!(bucket, key, region = %self.region, "Fetching file");

        let object = self.client.get_object(bucket, key).await.map_err(|e| {
            tracing::error!(bucket, key, region = %self.region, error = %e, "S3 get failed");
            Error::storage_with(
                format!(
                    "Error getting file for bucket {} key {} in region {}",
                    bucket, key, self.region
                ),
                e,
            )
        })?;

        let object = object.ok_or_else(|| {
            Error::storage(format!(
                "No object found for bucket {} key {} in region {}",
                bucket, key, self.region
            ))
        })?;

        Ok(CloudFile::new(
            object.body,
            object.content_length,
            object.content_type,
            object.metadata,
        ))
    }

    /// Delete a file by bucket and key. No region check is made.
    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        require_non_empty("bucket", bucket)?;
        require_non_empty("key", key)?;

        self.client.delete_object(bucket, key).await.map_err(|e| {
            tracing::error!(bucket, key, region = %self.region, error = %e, "S3 delete failed");
            Error::storage_with(
                format!(
                    "Error deleting file for bucket {} key {} in region {}",
                    bucket, key, self.region
                ),
                e,
            )
        })?;

        tracing::info!(bucket, key, region = %self.region, "File deleted");
        Ok(())
    }

    /// Sign a GET URL by bucket and key. No region check is made.
    pub async fn sign_object_url(&self, bucket: &str, key: &str, expiry_secs: i64) -> Result<String> {
        require_non_empty("bucket", bucket)?;
        require_non_empty("key", key)?;
        if expiry_secs <= 0 {
            return Err(Error::invalid_argument(format!(
                "expiry_secs {} is not positive for bucket {} key {}",
                expiry_secs, bucket, key
            )));
        }

        let expires_at = TimeDelta::try_seconds(expiry_secs)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| {
                Error::invalid_argument(format!(
                    "expiry_secs {} is out of range for bucket {} key {}",
                    expiry_secs, bucket, key
                ))
            })?;

        let url = self
            .signer
            .presign_get(bucket, key, expires_at)
            .await
            .map_err(|e| {
                tracing::error!(bucket, key, region = %self.region, error = %e, "S3 presign failed");
                Error::storage_with(
                    format!(
                        "Error creating expiring url for bucket {} key {} in region {}",
                        bucket, key, self.region
                    ),
                    e,
                )
            })?;

        tracing::debug!(bucket, key, %expires_at, "Expiring url created");
        Ok(url)
    }
}

#[async_trait]
impl CloudStorage for S3CloudStorage {
    fn parse_location(&self, uri: &str) -> Result<Location> {
        Location::parse(uri)
    }

    async fn store(
        &self,
        bucket: &str,
        key: &str,
        mut body: FileBody,
        options: StoreOptions,
    ) -> Result<String> {
        require_non_empty("bucket", bucket)?;
        require_non_empty("key", key)?;

        let content_type = options.content_type;
        let describe = || {
            format!(
                "Error storing file {} type {} in bucket {} region {}",
                key,
                content_type.as_deref().unwrap_or("unset"),
                bucket,
                self.region
            )
        };

        let mut data = Vec::new();
        body.read_to_end(&mut data)
            .await
            .map_err(|e| Error::storage_with(describe(), e))?;

        let request = PutObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            body: data.into(),
            content_type: content_type.clone(),
            content_length: options.content_length.filter(|len| *len > 0),
            metadata: options.metadata,
        };
        let size = request.body.len();

        self.client.put_object(request).await.map_err(|e| {
            tracing::error!(bucket, key, region = %self.region, error = %e, "S3 put failed");
            Error::storage_with(describe(), e)
        })?;

        let location = Location::new(&self.region, bucket, key);
        tracing::info!(%location, size_bytes = size, "File stored");

        Ok(location.to_string())
    }

    async fn fetch(&self, uri: &str) -> Result<CloudFile> {
        let location = self.locate(uri)?;
        self.fetch_object(&location.bucket, &location.key).await
    }

    async fn delete(&self, uri: &str) -> Result<()> {
        let location = self.locate(uri)?;
        self.delete_object(&location.bucket, &location.key).await
    }

    async fn sign_url(&self, uri: &str, expiry_secs: i64) -> Result<String> {
        let location = self.locate(uri)?;
        self.sign_object_url(&location.bucket, &location.key, expiry_secs)
            .await
    }
}

/// Builder for [`S3CloudStorage`] backed by the AWS SDK.
#[derive(Default)]
pub struct S3CloudStorageBuilder {
    credentials: Option<SharedCredentialsProvider>,
    signing_credentials: Option<SharedCredentialsProvider>,
    region: Option<String>,
    endpoint: Option<String>,
}

impl S3CloudStorageBuilder {
    /// Credentials for storing, fetching and deleting objects. Required.
    pub fn credentials(mut self, credentials: impl ProvideCredentials + 'static) -> Self {
        self.credentials = Some(SharedCredentialsProvider::new(credentials));
        self
    }

    /// Credentials for signing URLs. Falls back to [`credentials`](Self::credentials).
    pub fn signing_credentials(mut self, credentials: impl ProvideCredentials + 'static) -> Self {
        self.signing_credentials = Some(SharedCredentialsProvider::new(credentials));
        self
    }

    /// AWS region, e.g. `us-east-1`. Required.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Custom endpoint for S3-compatible providers. Enables path-style addressing.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn build(self) -> Result<S3CloudStorage> {
        let credentials = self
            .credentials
            .ok_or_else(|| Error::invalid_argument("aws credentials is not set"))?;
        let region = self.region.unwrap_or_default();
        require_region(&region)?;
        let signing_credentials = self.signing_credentials.unwrap_or_else(|| credentials.clone());

        let client = AwsObjectClient::new(credentials, region.clone(), self.endpoint.clone());
        let signer = AwsObjectClient::new(signing_credentials, region.clone(), self.endpoint);

        tracing::info!(region = %region, "S3 storage initialized");

        S3CloudStorage::with_clients(Arc::new(client), Arc::new(signer), region)
    }
}

fn require_region(region: &str) -> Result<()> {
    if region.trim().is_empty() {
        return Err(Error::invalid_argument("aws region is not set"));
    }
    Ok(())
}

fn require_non_empty(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::invalid_argument(format!("{} is empty", name)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_credential_types::Credentials;

    fn credentials(access_key: &str) -> Credentials {
        Credentials::new(access_key, "secret", None, None, "test")
    }

    #[test]
    fn test_build_requires_credentials() {
        let err = S3CloudStorage::builder()
            .region("us-east-1")
            .build()
            .err()
            .expect("build without credentials should fail");
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_build_requires_region() {
        let err = S3CloudStorage::builder()
            .credentials(credentials("AKIDPRIMARY"))
            .build()
            .err()
            .expect("build without region should fail");
        assert!(err.is_invalid_argument());

        let err = S3CloudStorage::builder()
            .credentials(credentials("AKIDPRIMARY"))
            .region("  ")
            .build()
            .err()
            .expect("build with blank region should fail");
        assert!(err.is_invalid_argument());
    }

    #[tokio::test]
    async fn test_sign_url_uses_signing_credentials() {
        let storage = S3CloudStorage::builder()
            .credentials(credentials("AKIDPRIMARY"))
            .signing_credentials(credentials("AKIDSIGNER"))
            .region("us-east-1")
            .build()
            .unwrap();

        let url = storage
            .sign_url("s3://us-east-1/my-bucket/my-file.txt", 600)
            .await
            .unwrap();

        assert!(url.contains("my-bucket"));
        assert!(url.contains("my-file.txt"));
        assert!(url.contains("X-Amz-Expires=600"));
        assert!(url.contains("AKIDSIGNER"));
        assert!(!url.contains("AKIDPRIMARY"));
    }

    #[tokio::test]
    async fn test_sign_url_defaults_to_primary_credentials() {
        let storage = S3CloudStorage::builder()
            .credentials(credentials("AKIDPRIMARY"))
            .region("us-east-1")
            .build()
            .unwrap();

        let url = storage
            .sign_object_url("my-bucket", "my-file.txt", 60)
            .await
            .unwrap();

        assert!(url.contains("AKIDPRIMARY"));
    }

    #[tokio::test]
    async fn test_sign_url_rejects_non_positive_expiry() {
        let storage = S3CloudStorage::builder()
            .credentials(credentials("AKIDPRIMARY"))
            .region("us-east-1")
            .build()
            .unwrap();

        for expiry in [0, -1] {
            let err = storage
                .sign_url("s3://us-east-1/my-bucket/my-file.txt", expiry)
                .await
                .unwrap_err();
            assert!(err.is_invalid_argument());
        }
    }
}
