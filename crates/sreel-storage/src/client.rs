//! S3-compatible storage client (DigitalOcean Spaces / Cloudflare R2 style).

use std::path::Path;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Configuration for the storage client.
#[derive(Debug, Clone)]
pub struct SpacesConfig {
    /// S3 API endpoint URL
    pub endpoint_url: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Bucket name
    pub bucket_name: String,
    /// Region ("auto" for R2)
    pub region: String,
    /// Public base URL for published objects (bucket CDN origin)
    pub public_base_url: String,
}

impl SpacesConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: std::env::var("SPACES_ENDPOINT_URL")
                .map_err(|_| StorageError::config_error("SPACES_ENDPOINT_URL not set"))?,
            access_key_id: std::env::var("SPACES_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("SPACES_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("SPACES_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("SPACES_SECRET_ACCESS_KEY not set"))?,
            bucket_name: std::env::var("SPACES_BUCKET_NAME")
                .map_err(|_| StorageError::config_error("SPACES_BUCKET_NAME not set"))?,
            region: std::env::var("SPACES_REGION").unwrap_or_else(|_| "auto".to_string()),
            public_base_url: std::env::var("SPACES_PUBLIC_BASE_URL")
                .map_err(|_| StorageError::config_error("SPACES_PUBLIC_BASE_URL not set"))?,
        })
    }
}

/// Object storage client for published artifacts.
#[derive(Clone)]
pub struct SpacesClient {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl SpacesClient {
    /// Create a new client from configuration.
    pub fn new(config: SpacesConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "spaces",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket_name,
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(SpacesConfig::from_env()?))
    }

    /// Public URL for a stored object.
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    /// Upload a local file and return its public URL.
    pub async fn upload_file(
        &self,
        path: impl AsRef<Path>,
        key: &str,
        content_type: &str,
    ) -> StorageResult<String> {
        let path = path.as_ref();
        debug!("Uploading {} to {}", path.display(), key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .acl(aws_sdk_s3::types::ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!("Uploaded {} to {}", path.display(), key);
        Ok(self.public_url(key))
    }

    /// Delete an object (best-effort housekeeping).
    pub async fn delete_object(&self, key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;
        Ok(())
    }
}
