use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use serde::Deserialize;

use crate::storage::S3CloudStorage;

const DEFAULT_CONFIG_PATH: &str = "cloudfile.toml";
const ENV_PREFIX: &str = "CLOUDFILE";

/// Top-level configuration loaded from file + environment.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageSection,
    pub logging: LoggingSection,
}

impl AppConfig {
    /// Load configuration from `$CLOUDFILE_CONFIG` (default `cloudfile.toml`) and
    /// the environment.
    pub fn load() -> Result<Self> {
        let config_path =
            env::var("CLOUDFILE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(config_path)
    }

    /// Load configuration from `path` if it exists, overlaid with
    /// `CLOUDFILE_<SECTION>__<KEY>` environment variables.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut builder = config::Config::builder();

        if path.exists() {
            builder = builder.add_source(config::File::from(PathBuf::from(path)));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| format!("failed to read configuration from {}", path.display()))?;
        let mut config: Self = settings.try_deserialize()?;

        if config.logging.level.trim().is_empty() {
            config.logging.level = "info".to_string();
        }
        config.storage.endpoint = config
            .storage
            .endpoint
            .take()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());

        Ok(config)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StorageSection {
    pub region: String,
    /// Bucket callers store into by default.
    pub bucket: String,
    pub endpoint: Option<String>,
    pub credentials: Option<CredentialsSection>,
    pub signing_credentials: Option<CredentialsSection>,
}

impl StorageSection {
    pub fn validate(&self) -> Result<()> {
        if self.region.trim().is_empty() {
            bail!("storage.region must be specified");
        }
        if self.bucket.trim().is_empty() {
            bail!("storage.bucket must be specified");
        }
        if let Some(credentials) = &self.credentials {
            credentials.validate("storage.credentials")?;
        }
        if let Some(credentials) = &self.signing_credentials {
            credentials.validate("storage.signing_credentials")?;
        }
        Ok(())
    }

    /// Build the S3 storage this section describes.
    ///
    /// Without static credentials the default AWS provider chain is used.
    pub async fn build_storage(&self) -> Result<S3CloudStorage> {
        self.validate()?;

        let mut builder = S3CloudStorage::builder().region(self.region.clone());

        builder = match &self.credentials {
            Some(credentials) => builder.credentials(credentials.to_credentials()),
            None => {
                let sdk_config = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(self.region.clone()))
                    .load()
                    .await;
                let provider = sdk_config
                    .credentials_provider()
                    .context("no AWS credentials found in the default provider chain")?;
                tracing::debug!("Using AWS credentials from the default provider chain");
                builder.credentials(provider)
            }
        };

        if let Some(credentials) = &self.signing_credentials {
            builder = builder.signing_credentials(credentials.to_credentials());
        }
        if let Some(endpoint) = &self.endpoint {
            builder = builder.endpoint(endpoint.clone());
        }

        builder.build().context("failed to build S3 storage")
    }
}

#[derive(Clone, Deserialize, Default)]
#[serde(default)]
pub struct CredentialsSection {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl CredentialsSection {
    fn validate(&self, section: &str) -> Result<()> {
        if self.access_key_id.trim().is_empty() {
            bail!("{}.access_key_id must be specified", section);
        }
        if self.secret_access_key.trim().is_empty() {
            bail!("{}.secret_access_key must be specified", section);
        }
        Ok(())
    }

    pub fn to_credentials(&self) -> Credentials {
        Credentials::new(
            &self.access_key_id,
            &self.secret_access_key,
            self.session_token.clone(),
            None,
            "cloudfile-config",
        )
    }
}

impl fmt::Debug for CredentialsSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsSection")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &self.session_token.as_ref().map(|_| "** redacted **"))
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}
