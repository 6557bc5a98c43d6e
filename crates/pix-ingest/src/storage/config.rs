use std::env;

use crate::error::{IngestError, IngestResult};

pub const DEFAULT_REGION: &str = "us-east-1";

/// S3 connection settings; `Debug` redacts the credentials
#[derive(Clone)]
pub struct StorageConfig {
    /// Custom S3-compatible endpoint (MinIO, localstack); `None` means AWS
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket: String,
    /// Explicit credentials; when absent the default AWS provider chain is used
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub path_style: bool,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("access_key", &self.access_key.as_ref().map(|_| "<redacted>"))
            .field("path_style", &self.path_style)
            .finish()
    }
}

impl StorageConfig {
    pub fn from_env() -> IngestResult<Self> {
        let bucket = env::var("S3_BUCKET")
            .map_err(|_| IngestError::Config("S3_BUCKET not set".to_string()))?;

        Ok(Self {
            endpoint: env::var("S3_ENDPOINT").ok().filter(|s| !s.is_empty()),
            region: env::var("S3_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .unwrap_or_else(|_| DEFAULT_REGION.to_string()),
            bucket,
            access_key: env::var("S3_ACCESS_KEY")
                .or_else(|_| env::var("AWS_ACCESS_KEY_ID"))
                .ok(),
            secret_key: env::var("S3_SECRET_KEY")
                .or_else(|_| env::var("AWS_SECRET_ACCESS_KEY"))
                .ok(),
            path_style: env::var("S3_PATH_STYLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        })
    }

    pub fn validate(&self) -> IngestResult<()> {
        if self.bucket.trim().is_empty() {
            return Err(IngestError::Config("S3 bucket cannot be empty".to_string()));
        }
        if self.region.trim().is_empty() {
            return Err(IngestError::Config("S3 region cannot be empty".to_string()));
        }
        if self.access_key.is_some() != self.secret_key.is_some() {
            return Err(IngestError::Config(
                "S3 access key and secret key must be set together".to_string(),
            ));
        }
        Ok(())
    }

    /// Publicly constructible URL of an object stored under `key`
    pub fn object_url(&self, key: &str) -> String {
        match &self.endpoint {
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            ),
            Some(endpoint) => {
                let endpoint = endpoint.trim_end_matches('/');
                if self.path_style {
                    return format!("{}/{}/{}", endpoint, self.bucket, key);
                }
                match endpoint.split_once("://") {
                    Some((scheme, host)) => format!("{}://{}.{}/{}", scheme, self.bucket, host, key),
                    None => format!("https://{}.{}/{}", self.bucket, endpoint, key),
                }
            },
        }
    }
}

#[cfg(test)]
impl StorageConfig {
    pub(crate) fn for_aws(region: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            endpoint: None,
            region: region.into(),
            bucket: bucket.into(),
            access_key: None,
            secret_key: None,
            path_style: false,
        }
    }

    pub(crate) fn for_minio(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            region: DEFAULT_REGION.to_string(),
            bucket: bucket.into(),
            access_key: Some("minioadmin".to_string()),
            secret_key: Some("minioadmin".to_string()),
            path_style: true,
        }
    }
}
