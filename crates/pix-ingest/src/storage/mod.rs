//! Blob storage for downloaded photo content

use async_trait::async_trait;
use aws_sdk_s3::{
    config::{BehaviorVersion, Credentials, Region},
    error::DisplayErrorContext,
    primitives::ByteStream,
    Client,
};
use tracing::{debug, info, instrument};

use crate::error::{IngestError, IngestResult};

pub mod config;

pub use config::StorageConfig;

/// Durable storage for binary payloads, addressed by key.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `key` and return a locator for it.
    ///
    /// Uploading an existing key overwrites the object.
    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: Option<String>,
    ) -> IngestResult<String>;
}

#[derive(Clone)]
pub struct S3BlobStore {
    client: Client,
    config: StorageConfig,
}

impl S3BlobStore {
    pub async fn new(config: StorageConfig) -> IngestResult<Self> {
        config.validate()?;
        debug!("Initializing storage with config: {:?}", config);

        let mut builder = match (&config.access_key, &config.secret_key) {
            (Some(access_key), Some(secret_key)) => {
                let credentials = Credentials::new(access_key, secret_key, None, None, "pix-storage");
                aws_sdk_s3::Config::builder()
                    .behavior_version(BehaviorVersion::latest())
                    .credentials_provider(credentials)
            },
            _ => {
                let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
                    .region(Region::new(config.region.clone()))
                    .load()
                    .await;
                aws_sdk_s3::config::Builder::from(&shared)
            },
        };

        builder = builder
            .region(Region::new(config.region.clone()))
            .force_path_style(config.path_style);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(builder.build());

        info!(bucket = %config.bucket, region = %config.region, "Storage client initialized");

        Ok(Self { client, config })
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    #[instrument(skip(self, data, content_type), fields(bucket = %self.config.bucket, size = data.len()))]
    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: Option<String>,
    ) -> IngestResult<String> {
        debug!("Uploading {} bytes to s3://{}/{}", data.len(), self.config.bucket, key);

        let mut request = self
            .client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .body(ByteStream::from(data));

        if let Some(ct) = content_type {
            request = request.content_type(ct);
        }

        request
            .send()
            .await
            .map_err(|e| IngestError::storage(key, DisplayErrorContext(e)))?;

        info!("Successfully uploaded to s3://{}/{}", self.config.bucket, key);

        Ok(self.config.object_url(key))
    }
}
