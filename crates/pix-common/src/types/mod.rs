//! Common types used across PIX

use serde::{Deserialize, Serialize};

/// Provider tag recorded in the `source` column for Unsplash ingests.
pub const DEFAULT_SOURCE_TAG: &str = "unsplash";

/// A candidate photo returned by the provider, not yet persisted.
///
/// Records are read-only once built from a provider response and are dropped
/// after one pipeline pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRecord {
    /// Provider-assigned identifier; the deduplication key
    pub external_id: String,
    /// Location of the full-resolution content
    pub source_url: String,
    /// Tag titles in provider order
    pub labels: Vec<String>,
}

impl ExternalRecord {
    pub fn new(
        external_id: impl Into<String>,
        source_url: impl Into<String>,
        labels: Vec<String>,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            source_url: source_url.into(),
            labels,
        }
    }
}

/// Metadata for an ingested photo, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAsset {
    pub filename: String,
    pub storage_url: String,
    pub source: String,
    pub labels: Vec<String>,
    pub external_id: String,
}

impl NewAsset {
    /// Attach a store-assigned primary key
    pub fn with_id(self, id: i64) -> StoredAsset {
        StoredAsset {
            id,
            filename: self.filename,
            storage_url: self.storage_url,
            source: self.source,
            labels: self.labels,
            external_id: self.external_id,
        }
    }
}

/// A persisted photo row.
///
/// The metadata store owns these once inserted; the pipeline never updates or
/// deletes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAsset {
    pub id: i64,
    pub filename: String,
    pub storage_url: String,
    pub source: String,
    pub labels: Vec<String>,
    pub external_id: String,
}
