//! Ingestion error taxonomy
//!
//! Errors split into two groups. Record-level errors (`RecordDownload`,
//! `Storage`, `InvalidKey`, `InvalidRecord`) fail one record and the batch
//! moves on.
//! Batch-level errors (`ProviderFetch`, `StoreUnavailable`, `Config`) abort
//! the run. `ConstraintViolation` is neither: the pipeline counts it as a
//! skipped duplicate.

use thiserror::Error;

/// Result type alias for ingestion operations
pub type IngestResult<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    /// The provider batch call failed (transport, non-2xx, or unreadable body)
    #[error("Provider fetch failed: {0}")]
    ProviderFetch(String),

    /// Downloading one record's content failed
    #[error("Download of {url} failed: {message}")]
    RecordDownload { url: String, message: String },

    /// Uploading to the blob store failed
    #[error("Upload to '{key}' failed: {message}")]
    Storage { key: String, message: String },

    /// The metadata store already holds a row for this external id
    #[error("Asset with external id '{external_id}' already exists")]
    ConstraintViolation { external_id: String },

    /// The metadata store could not be reached
    #[error("Metadata store unavailable: {0}. Check DATABASE_URL and that PostgreSQL is running.")]
    StoreUnavailable(String),

    /// Provider data would produce a malformed storage key
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// The metadata store rejected one record's data (bad encoding, check
    /// or not-null constraint)
    #[error("Metadata store rejected record: {0}")]
    InvalidRecord(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IngestError {
    pub fn download(url: impl Into<String>, message: impl ToString) -> Self {
        Self::RecordDownload {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn storage(key: impl Into<String>, message: impl ToString) -> Self {
        Self::Storage {
            key: key.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error must abort the whole batch
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IngestError::ProviderFetch(_) | IngestError::StoreUnavailable(_) | IngestError::Config(_)
        )
    }
}
