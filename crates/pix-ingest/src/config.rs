//! Configuration management
//!
//! Everything is read once at process start: `.env` (if present) is loaded
//! into the environment, variables are read with defaults, and the result is
//! validated before any network call is made.

use pix_common::types::DEFAULT_SOURCE_TAG;
use serde::{Deserialize, Serialize};

use crate::db::DbConfig;
use crate::error::{IngestError, IngestResult};
use crate::naming::{fallback_extension, DEFAULT_EXTENSION};
use crate::storage::StorageConfig;

// ============================================================================
// Provider Configuration Constants
// ============================================================================

/// Default Unsplash API base URL.
pub const DEFAULT_UNSPLASH_API_URL: &str = "https://api.unsplash.com";

/// Default batch size.
pub const DEFAULT_BATCH_COUNT: u32 = 10;

/// Largest batch `/photos/random` will return.
pub const MAX_BATCH_COUNT: u32 = 30;

/// Default per-request HTTP timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

#[derive(Clone)]
pub struct ProviderConfig {
    pub api_url: String,
    pub access_key: String,
    /// Search term; also the storage namespace for this run
    pub query: String,
    pub count: u32,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_url", &self.api_url)
            .field("access_key", &"<redacted>")
            .field("query", &self.query)
            .field("count", &self.count)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ProviderConfig {
    pub fn new(access_key: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_UNSPLASH_API_URL.to_string(),
            access_key: access_key.into(),
            query: query.into(),
            count: DEFAULT_BATCH_COUNT,
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }

    pub fn from_env() -> IngestResult<Self> {
        let access_key = std::env::var("UNSPLASH_ACCESS_KEY")
            .map_err(|_| IngestError::Config("UNSPLASH_ACCESS_KEY not set".to_string()))?;
        let query = std::env::var("UNSPLASH_QUERY")
            .map_err(|_| IngestError::Config("UNSPLASH_QUERY not set".to_string()))?;

        let count = match std::env::var("UNSPLASH_COUNT") {
            Ok(raw) => raw.trim().parse().map_err(|_| {
                IngestError::Config(format!("UNSPLASH_COUNT must be a positive integer, got '{}'", raw))
            })?,
            Err(_) => DEFAULT_BATCH_COUNT,
        };

        Ok(Self {
            api_url: std::env::var("UNSPLASH_API_URL")
                .unwrap_or_else(|_| DEFAULT_UNSPLASH_API_URL.to_string()),
            access_key,
            query,
            count,
            timeout_secs: std::env::var("UNSPLASH_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        })
    }

    pub fn validate(&self) -> IngestResult<()> {
        if self.access_key.trim().is_empty() {
            return Err(IngestError::Config("Unsplash access key cannot be empty".to_string()));
        }
        if self.query.trim().is_empty() {
            return Err(IngestError::Config("Search query cannot be empty".to_string()));
        }
        if self.query.contains('/') {
            return Err(IngestError::Config(format!(
                "Search query '{}' is used as a storage namespace and must not contain '/'",
                self.query
            )));
        }
        if self.count == 0 || self.count > MAX_BATCH_COUNT {
            return Err(IngestError::Config(format!(
                "Batch count must be between 1 and {}, got {}",
                MAX_BATCH_COUNT, self.count
            )));
        }
        if url::Url::parse(&self.api_url).is_err() {
            return Err(IngestError::Config(format!("Invalid provider URL '{}'", self.api_url)));
        }
        if self.timeout_secs == 0 {
            return Err(IngestError::Config("HTTP timeout must be greater than 0".to_string()));
        }
        Ok(())
    }
}

/// Knobs of the pipeline itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Value written to the `source` column
    pub source_tag: String,
    /// Extension used when neither URL nor content type provides one
    pub default_extension: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_tag: DEFAULT_SOURCE_TAG.to_string(),
            default_extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            source_tag: std::env::var("PIX_SOURCE_TAG").unwrap_or(defaults.source_tag),
            default_extension: std::env::var("PIX_DEFAULT_EXTENSION")
                .unwrap_or(defaults.default_extension),
        }
    }

    pub fn validate(&self) -> IngestResult<()> {
        if self.source_tag.trim().is_empty() {
            return Err(IngestError::Config("Source tag cannot be empty".to_string()));
        }
        if fallback_extension(&self.default_extension).is_none() {
            return Err(IngestError::Config(format!(
                "Default extension '{}' must be 1-8 ASCII letters or digits",
                self.default_extension
            )));
        }
        Ok(())
    }
}

/// Complete configuration of one ingestion run
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub provider: ProviderConfig,
    pub storage: StorageConfig,
    pub database: DbConfig,
    pub pipeline: PipelineConfig,
}

impl IngestConfig {
    /// Load configuration from `.env` and the environment, then validate it
    pub fn load() -> IngestResult<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            provider: ProviderConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            database: DbConfig::from_env()?,
            pipeline: PipelineConfig::from_env(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides and re-validate
    pub fn with_overrides(mut self, query: Option<String>, count: Option<u32>) -> IngestResult<Self> {
        if let Some(query) = query {
            self.provider.query = query;
        }
        if let Some(count) = count {
            self.provider.count = count;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> IngestResult<()> {
        self.provider.validate()?;
        self.storage.validate()?;
        self.database.validate()?;
        self.pipeline.validate()?;
        Ok(())
    }
}
