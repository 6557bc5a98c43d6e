//! Unsplash photo provider
//!
//! One batch request against `/photos/random`, then one plain GET per new
//! record to fetch its full-resolution bytes.

use async_trait::async_trait;
use pix_common::types::ExternalRecord;
use reqwest::{header, Client};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::config::ProviderConfig;
use crate::error::{IngestError, IngestResult};

/// Raw content of one photo
#[derive(Debug, Clone)]
pub struct Download {
    pub bytes: Vec<u8>,
    /// `Content-Type` reported by the server, if any
    pub content_type: Option<String>,
}

/// Source of candidate photos and their content.
#[async_trait]
pub trait PhotoSource: Send + Sync {
    /// Fetch one bounded batch of records matching `query`
    async fn fetch_batch(&self, query: &str, count: u32) -> IngestResult<Vec<ExternalRecord>>;

    /// Fetch the bytes behind a record's `source_url`
    async fn download(&self, url: &str) -> IngestResult<Download>;
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct PhotoResponse {
    id: String,
    urls: PhotoUrls,
    #[serde(default)]
    tags: Option<Vec<TagResponse>>,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    full: String,
}

#[derive(Debug, Deserialize)]
struct TagResponse {
    #[serde(default)]
    title: Option<String>,
}

impl From<PhotoResponse> for ExternalRecord {
    fn from(photo: PhotoResponse) -> Self {
        let labels = photo
            .tags
            .unwrap_or_default()
            .into_iter()
            .filter_map(|tag| tag.title)
            .collect();

        ExternalRecord::new(photo.id, photo.urls.full, labels)
    }
}

/// Parse a `/photos/random?count=N` response body
pub fn parse_batch(body: &str) -> IngestResult<Vec<ExternalRecord>> {
    let photos: Vec<PhotoResponse> = serde_json::from_str(body)
        .map_err(|e| IngestError::ProviderFetch(format!("Malformed provider response: {}", e)))?;

    Ok(photos.into_iter().map(ExternalRecord::from).collect())
}

// ============================================================================
// Client
// ============================================================================

pub struct UnsplashClient {
    client: Client,
    api_url: String,
    access_key: String,
}

impl UnsplashClient {
    pub fn new(config: &ProviderConfig) -> IngestResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("pix-ingest/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| IngestError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            access_key: config.access_key.clone(),
        })
    }

    fn random_photos_url(&self) -> String {
        format!("{}/photos/random", self.api_url)
    }
}

#[async_trait]
impl PhotoSource for UnsplashClient {
    #[instrument(skip(self))]
    async fn fetch_batch(&self, query: &str, count: u32) -> IngestResult<Vec<ExternalRecord>> {
        let url = self.random_photos_url();
        debug!(%url, "Requesting photo batch");

        let response = self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, format!("Client-ID {}", self.access_key))
            .header("Accept-Version", "v1")
            .query(&[("query", query.to_string()), ("count", count.to_string())])
            .send()
            .await
            .map_err(|e| IngestError::ProviderFetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| IngestError::ProviderFetch(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| IngestError::ProviderFetch(e.to_string()))?;

        let mut records = parse_batch(&body)?;

        if records.len() > count as usize {
            warn!(
                received = records.len(),
                requested = count,
                "Provider returned more records than requested, truncating"
            );
            records.truncate(count as usize);
        }

        info!(count = records.len(), "Fetched photo batch");
        Ok(records)
    }

    #[instrument(skip(self))]
    async fn download(&self, url: &str) -> IngestResult<Download> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| IngestError::download(url, e))?
            .error_for_status()
            .map_err(|e| IngestError::download(url, e))?;

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| IngestError::download(url, e))?
            .to_vec();

        debug!(size = bytes.len(), content_type = ?content_type, "Downloaded content");

        Ok(Download {
            bytes,
            content_type,
        })
    }
}
