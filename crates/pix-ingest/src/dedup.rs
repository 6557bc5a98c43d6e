//! Duplicate detection keyed on the provider's external id

use std::sync::Arc;
use tracing::debug;

use crate::db::AssetRepository;
use crate::error::IngestResult;

/// Read-only check against the metadata store.
///
/// This is the first of two guards against duplicate rows; the store's
/// UNIQUE constraint is the second.
#[derive(Clone)]
pub struct DuplicateChecker {
    repository: Arc<dyn AssetRepository>,
}

impl DuplicateChecker {
    pub fn new(repository: Arc<dyn AssetRepository>) -> Self {
        Self { repository }
    }

    /// Whether an asset was already ingested under `external_id`.
    ///
    /// Store failures are returned as errors, never as "not found".
    pub async fn exists(&self, external_id: &str) -> IngestResult<bool> {
        let found = self
            .repository
            .find_by_external_id(external_id)
            .await?
            .is_some();
        debug!(external_id, found, "Duplicate check");
        Ok(found)
    }
}
