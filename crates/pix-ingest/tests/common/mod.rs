//! Shared fixtures for pipeline tests
//!
//! In-memory stand-ins for the blob store and metadata repository with call
//! counters, plus helpers that mount Unsplash-shaped responses on a wiremock
//! server.

#![allow(dead_code)]

use async_trait::async_trait;
use pix_common::types::{NewAsset, StoredAsset};
use pix_ingest::{
    config::{PipelineConfig, ProviderConfig},
    db::AssetRepository,
    pipeline::IngestPipeline,
    provider::UnsplashClient,
    storage::BlobStore,
    IngestError, IngestResult,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

pub const ACCESS_KEY: &str = "test-key";

/// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,pix_ingest=debug")),
        )
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Metadata repository
// ============================================================================

#[derive(Default)]
pub struct InMemoryRepository {
    rows: Mutex<Vec<StoredAsset>>,
    /// Lookups always miss, as if the read raced a concurrent insert
    stale_reads: bool,
    /// Every call fails as if the database were down
    unavailable: bool,
    /// Lookups succeed but inserts fail, as if the database went away mid-batch
    insert_unavailable: bool,
    pub find_calls: AtomicUsize,
    pub insert_calls: AtomicUsize,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stale_reads() -> Self {
        Self {
            stale_reads: true,
            ..Self::default()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn failing_inserts() -> Self {
        Self {
            insert_unavailable: true,
            ..Self::default()
        }
    }

    /// Pretend `external_id` was ingested by an earlier run
    pub fn seed(&self, external_id: &str) {
        let mut rows = self.rows.lock().unwrap();
        let id = rows.len() as i64 + 1;
        rows.push(StoredAsset {
            id,
            filename: format!("seed-{}.jpg", external_id),
            storage_url: format!("memory://seed/{}", external_id),
            source: "unsplash".to_string(),
            labels: Vec::new(),
            external_id: external_id.to_string(),
        });
    }

    pub fn rows(&self) -> Vec<StoredAsset> {
        self.rows.lock().unwrap().clone()
    }

    pub fn external_ids(&self) -> Vec<String> {
        self.rows().into_iter().map(|row| row.external_id).collect()
    }
}

#[async_trait]
impl AssetRepository for InMemoryRepository {
    async fn find_by_external_id(&self, external_id: &str) -> IngestResult<Option<StoredAsset>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(IngestError::StoreUnavailable("connection refused".to_string()));
        }
        if self.stale_reads {
            return Ok(None);
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.external_id == external_id)
            .cloned())
    }

    async fn insert(&self, asset: NewAsset) -> IngestResult<StoredAsset> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable || self.insert_unavailable {
            return Err(IngestError::StoreUnavailable("connection refused".to_string()));
        }
        // PostgreSQL text columns cannot hold NUL
        if asset.labels.iter().any(|label| label.contains('\0')) {
            return Err(IngestError::InvalidRecord(format!(
                "{}: invalid byte sequence for encoding \"UTF8\": 0x00",
                asset.external_id
            )));
        }
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|row| row.external_id == asset.external_id) {
            return Err(IngestError::ConstraintViolation {
                external_id: asset.external_id,
            });
        }
        let stored = asset.with_id(rows.len() as i64 + 1);
        rows.push(stored.clone());
        Ok(stored)
    }
}

// ============================================================================
// Blob store
// ============================================================================

#[derive(Default)]
pub struct InMemoryBlobStore {
    objects: Mutex<HashMap<String, (Vec<u8>, Option<String>)>>,
    fail_uploads: bool,
    pub upload_calls: AtomicUsize,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects every upload, as with a missing bucket permission
    pub fn failing() -> Self {
        Self {
            fail_uploads: true,
            ..Self::default()
        }
    }

    pub fn uploads(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn object(&self, key: &str) -> Option<(Vec<u8>, Option<String>)> {
        self.objects.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: Option<String>,
    ) -> IngestResult<String> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_uploads {
            return Err(IngestError::storage(key, "AccessDenied"));
        }
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (data, content_type));
        Ok(format!("memory://{}", key))
    }
}

// ============================================================================
// Provider
// ============================================================================

/// One element of a `/photos/random` response
pub fn photo_json(id: &str, full_url: &str, tags: &[&str]) -> Value {
    let tags: Vec<Value> = tags.iter().map(|t| json!({ "type": "search", "title": t })).collect();
    json!({
        "id": id,
        "urls": { "raw": full_url, "full": full_url, "small": full_url },
        "tags": tags,
    })
}

/// Serve `photos` for `query`/`count`, expecting exactly `expected_calls` requests
pub async fn mount_batch(server: &MockServer, query: &str, count: u32, photos: Vec<Value>, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/photos/random"))
        .and(query_param("query", query))
        .and(query_param("count", count.to_string()))
        .and(header("Authorization", format!("Client-ID {}", ACCESS_KEY).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(photos)))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Serve `body` at `route` with the given content type
pub async fn mount_image(server: &MockServer, route: &str, body: &[u8], content_type: &str, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_vec(), content_type))
        .expect(expected_calls)
        .mount(server)
        .await;
}

pub fn provider_config(server: &MockServer, query: &str) -> ProviderConfig {
    let mut config = ProviderConfig::new(ACCESS_KEY, query);
    config.api_url = server.uri();
    config.timeout_secs = 5;
    config
}

pub fn pipeline(
    server: &MockServer,
    blobs: Arc<InMemoryBlobStore>,
    repository: Arc<InMemoryRepository>,
) -> IngestPipeline {
    pipeline_with(server, 5, PipelineConfig::default(), blobs, repository)
}

pub fn pipeline_with(
    server: &MockServer,
    timeout_secs: u64,
    config: PipelineConfig,
    blobs: Arc<InMemoryBlobStore>,
    repository: Arc<InMemoryRepository>,
) -> IngestPipeline {
    let mut provider = provider_config(server, "unused");
    provider.timeout_secs = timeout_secs;

    IngestPipeline::new(
        Arc::new(UnsplashClient::new(&provider).unwrap()),
        blobs,
        repository,
        config,
    )
}
