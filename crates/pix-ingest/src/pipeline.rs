//! Photo ingestion pipeline
//!
//! One run fetches a bounded batch from the provider and walks it strictly in
//! order, one record at a time:
//!
//! ```text
//! Fetched -> CheckedNew -> Downloaded -> Addressed -> Uploaded -> Persisted
//!    |                                                    |
//!    +--> SkippedDuplicate <------ (unique violation) ----+
//!
//! any record-level error --> Failed (batch continues)
//! provider / store outage --> batch aborts
//! ```
//!
//! Nothing is spawned and no transaction spans network I/O: each store call
//! commits on its own, and a lost race against a concurrent ingester surfaces
//! as a unique violation that is counted as a skip.

use chrono::{DateTime, Utc};
use pix_common::types::{ExternalRecord, NewAsset, StoredAsset};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::config::PipelineConfig;
use crate::db::AssetRepository;
use crate::dedup::DuplicateChecker;
use crate::error::{IngestError, IngestResult};
use crate::naming::{derive_filename, storage_key};
use crate::provider::PhotoSource;
use crate::storage::BlobStore;

/// Lifecycle of one record within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    Fetched,
    CheckedNew,
    Downloaded,
    Addressed,
    Uploaded,
    Persisted,
    SkippedDuplicate,
    Failed,
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordState::Fetched => "fetched",
            RecordState::CheckedNew => "checked_new",
            RecordState::Downloaded => "downloaded",
            RecordState::Addressed => "addressed",
            RecordState::Uploaded => "uploaded",
            RecordState::Persisted => "persisted",
            RecordState::SkippedDuplicate => "skipped_duplicate",
            RecordState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Why a record was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The duplicate check found an existing row
    AlreadyIngested,
    /// The check passed but the insert hit the unique constraint
    LostInsertRace,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyIngested => f.write_str("already ingested"),
            SkipReason::LostInsertRace => f.write_str("inserted concurrently"),
        }
    }
}

/// Terminal result for one record
#[derive(Debug)]
pub enum RecordOutcome {
    Ingested { asset: StoredAsset, bytes: u64 },
    SkippedDuplicate(SkipReason),
    /// `state` is the last state the record reached before `error`
    Failed { state: RecordState, error: IngestError },
}

impl RecordOutcome {
    /// The terminal state this outcome represents
    pub fn state(&self) -> RecordState {
        match self {
            RecordOutcome::Ingested { .. } => RecordState::Persisted,
            RecordOutcome::SkippedDuplicate(_) => RecordState::SkippedDuplicate,
            RecordOutcome::Failed { .. } => RecordState::Failed,
        }
    }
}

#[derive(Debug)]
pub struct RecordResult {
    pub external_id: String,
    pub outcome: RecordOutcome,
}

/// Summary of one pipeline run
#[derive(Debug)]
pub struct IngestReport {
    pub query: String,
    pub total: usize,
    pub ingested: usize,
    pub skipped: usize,
    pub failed: usize,
    pub bytes_uploaded: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Per-record results in processing order
    pub results: Vec<RecordResult>,
}

impl IngestReport {
    fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            total: 0,
            ingested: 0,
            skipped: 0,
            failed: 0,
            bytes_uploaded: 0,
            started_at: Utc::now(),
            completed_at: None,
            results: Vec::new(),
        }
    }

    fn record(&mut self, external_id: String, outcome: RecordOutcome) {
        self.total += 1;
        match &outcome {
            RecordOutcome::Ingested { bytes, .. } => {
                self.ingested += 1;
                self.bytes_uploaded += bytes;
            },
            RecordOutcome::SkippedDuplicate(_) => self.skipped += 1,
            RecordOutcome::Failed { .. } => self.failed += 1,
        }
        self.results.push(RecordResult {
            external_id,
            outcome,
        });
    }

    fn finish(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    /// True when at least one record ended in `Failed`
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn duration_secs(&self) -> f64 {
        let end = self.completed_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds() as f64 / 1000.0
    }

    /// Ingested assets in processing order
    pub fn ingested_assets(&self) -> impl Iterator<Item = &StoredAsset> {
        self.results.iter().filter_map(|r| match &r.outcome {
            RecordOutcome::Ingested { asset, .. } => Some(asset),
            _ => None,
        })
    }
}

/// A record-level error tagged with where it happened
struct StageError {
    state: RecordState,
    error: IngestError,
}

impl StageError {
    fn after(state: RecordState) -> impl FnOnce(IngestError) -> Self {
        move |error| Self { state, error }
    }
}

fn enter(record: &ExternalRecord, state: RecordState) -> RecordState {
    debug!(external_id = %record.external_id, %state, "Record state");
    state
}

pub struct IngestPipeline {
    source: Arc<dyn PhotoSource>,
    blobs: Arc<dyn BlobStore>,
    repository: Arc<dyn AssetRepository>,
    checker: DuplicateChecker,
    config: PipelineConfig,
}

impl IngestPipeline {
    pub fn new(
        source: Arc<dyn PhotoSource>,
        blobs: Arc<dyn BlobStore>,
        repository: Arc<dyn AssetRepository>,
        config: PipelineConfig,
    ) -> Self {
        let checker = DuplicateChecker::new(Arc::clone(&repository));
        Self {
            source,
            blobs,
            repository,
            checker,
            config,
        }
    }

    /// Fetch one batch for `query` and ingest every new record.
    ///
    /// `query` doubles as the storage namespace. Returns `Err` only for
    /// batch-level failures (provider fetch, metadata store outage); record
    /// failures are reported in the returned [`IngestReport`].
    #[instrument(skip(self))]
    pub async fn run(&self, query: &str, count: u32) -> IngestResult<IngestReport> {
        let mut report = IngestReport::new(query);

        let records = self.source.fetch_batch(query, count).await?;
        info!(records = records.len(), "Processing batch");

        for record in records {
            let outcome = self.process_record(query, &record).await?;
            log_outcome(&record, &outcome);
            report.record(record.external_id, outcome);
        }

        report.finish();

        info!(
            total = report.total,
            ingested = report.ingested,
            skipped = report.skipped,
            failed = report.failed,
            bytes = report.bytes_uploaded,
            duration_secs = report.duration_secs(),
            "Batch complete"
        );

        Ok(report)
    }

    /// Drive one record to a terminal state.
    ///
    /// Fatal errors propagate; everything else becomes an outcome.
    pub async fn process_record(
        &self,
        namespace: &str,
        record: &ExternalRecord,
    ) -> IngestResult<RecordOutcome> {
        let state = enter(record, RecordState::Fetched);

        match self.checker.exists(&record.external_id).await {
            Ok(true) => {
                enter(record, RecordState::SkippedDuplicate);
                return Ok(RecordOutcome::SkippedDuplicate(SkipReason::AlreadyIngested));
            },
            Ok(false) => {},
            Err(error) if error.is_fatal() => return Err(error),
            Err(error) => {
                enter(record, RecordState::Failed);
                return Ok(RecordOutcome::Failed { state, error });
            },
        }

        match self.ingest_new(namespace, record).await {
            Ok((asset, bytes)) => {
                enter(record, RecordState::Persisted);
                Ok(RecordOutcome::Ingested { asset, bytes })
            },
            Err(StageError { error, .. }) if error.is_fatal() => Err(error),
            Err(StageError {
                error: IngestError::ConstraintViolation { .. },
                ..
            }) => {
                enter(record, RecordState::SkippedDuplicate);
                Ok(RecordOutcome::SkippedDuplicate(SkipReason::LostInsertRace))
            },
            Err(StageError { state, error }) => {
                enter(record, RecordState::Failed);
                Ok(RecordOutcome::Failed { state, error })
            },
        }
    }

    async fn ingest_new(
        &self,
        namespace: &str,
        record: &ExternalRecord,
    ) -> Result<(StoredAsset, u64), StageError> {
        let state = enter(record, RecordState::CheckedNew);

        let download = self
            .source
            .download(&record.source_url)
            .await
            .map_err(StageError::after(state))?;
        let state = enter(record, RecordState::Downloaded);

        let filename = derive_filename(
            &download.bytes,
            &record.source_url,
            download.content_type.as_deref(),
            &self.config.default_extension,
        )
        .map_err(StageError::after(state))?;
        let key = storage_key(namespace, &filename).map_err(StageError::after(state))?;
        let state = enter(record, RecordState::Addressed);

        let bytes = download.bytes.len() as u64;
        let storage_url = self
            .blobs
            .upload(&key, download.bytes, download.content_type)
            .await
            .map_err(StageError::after(state))?;
        let state = enter(record, RecordState::Uploaded);

        let asset = self
            .repository
            .insert(NewAsset {
                filename,
                storage_url,
                source: self.config.source_tag.clone(),
                labels: record.labels.clone(),
                external_id: record.external_id.clone(),
            })
            .await
            .map_err(StageError::after(state))?;

        Ok((asset, bytes))
    }
}

fn log_outcome(record: &ExternalRecord, outcome: &RecordOutcome) {
    match outcome {
        RecordOutcome::Ingested { asset, bytes } => info!(
            external_id = %record.external_id,
            filename = %asset.filename,
            storage_url = %asset.storage_url,
            bytes,
            "ingested"
        ),
        RecordOutcome::SkippedDuplicate(reason) => info!(
            external_id = %record.external_id,
            %reason,
            "skipped"
        ),
        RecordOutcome::Failed { state, error } => warn!(
            external_id = %record.external_id,
            after = %state,
            error = %error,
            "failed"
        ),
    }
}
