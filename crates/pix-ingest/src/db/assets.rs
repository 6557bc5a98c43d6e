//! Asset metadata repository
//!
//! The pipeline talks to the metadata store only through [`AssetRepository`].
//! Each call runs in its own implicit transaction; nothing is held open
//! across downloads or uploads.

use async_trait::async_trait;
use pix_common::types::{NewAsset, StoredAsset};
use sqlx::{Error as SqlxError, PgPool};
use tracing::{debug, instrument, warn};

use crate::error::{IngestError, IngestResult};

#[async_trait]
pub trait AssetRepository: Send + Sync {
    /// Look up the asset ingested under `external_id`, if any
    async fn find_by_external_id(&self, external_id: &str) -> IngestResult<Option<StoredAsset>>;

    /// Insert a new asset and return it with its assigned id.
    ///
    /// Fails with [`IngestError::ConstraintViolation`] when `external_id` is
    /// already present, and with [`IngestError::InvalidRecord`] when the store
    /// rejects the row's values.
    async fn insert(&self, asset: NewAsset) -> IngestResult<StoredAsset>;
}

#[derive(Debug, sqlx::FromRow)]
struct AssetRow {
    id: i64,
    filename: String,
    storage_url: String,
    source: String,
    labels: Option<Vec<String>>,
    external_id: String,
}

impl From<AssetRow> for StoredAsset {
    fn from(row: AssetRow) -> Self {
        Self {
            id: row.id,
            filename: row.filename,
            storage_url: row.storage_url,
            source: row.source,
            labels: row.labels.unwrap_or_default(),
            external_id: row.external_id,
        }
    }
}

/// Check if the error is a unique constraint violation
pub fn is_unique_violation(error: &SqlxError) -> bool {
    if let SqlxError::Database(db_err) = error {
        return db_err.is_unique_violation();
    }
    false
}

/// SQLSTATE classes caused by the values of one statement: `22` data
/// exception, `23` integrity constraint violation
fn is_record_sqlstate(code: &str) -> bool {
    code.starts_with("22") || code.starts_with("23")
}

/// Map a sqlx error onto the ingestion taxonomy.
///
/// Unique violations become [`IngestError::ConstraintViolation`]. Errors
/// caused by the row's own data become [`IngestError::InvalidRecord`] so only
/// that record fails. Everything else means the store itself is unusable.
pub fn classify_db_error(error: SqlxError, external_id: &str) -> IngestError {
    match &error {
        _ if is_unique_violation(&error) => IngestError::ConstraintViolation {
            external_id: external_id.to_string(),
        },
        SqlxError::Database(db_err)
            if db_err.code().is_some_and(|code| is_record_sqlstate(&code)) =>
        {
            IngestError::InvalidRecord(format!("{}: {}", external_id, error))
        },
        SqlxError::Encode(_) => IngestError::InvalidRecord(format!("{}: {}", external_id, error)),
        _ => IngestError::StoreUnavailable(error.to_string()),
    }
}

/// PostgreSQL-backed repository over the `images` table
#[derive(Clone)]
pub struct PgAssetRepository {
    pool: PgPool,
}

impl PgAssetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Number of ingested assets
    pub async fn count(&self) -> IngestResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM images")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| IngestError::StoreUnavailable(e.to_string()))
    }

    /// [`count`](Self::count) for reporting after a batch has committed:
    /// a failure is logged and yields `None`
    pub async fn count_best_effort(&self) -> Option<i64> {
        match self.count().await {
            Ok(count) => Some(count),
            Err(e) => {
                warn!(error = %e, "Could not count stored assets");
                None
            },
        }
    }
}

#[async_trait]
impl AssetRepository for PgAssetRepository {
    #[instrument(skip(self))]
    async fn find_by_external_id(&self, external_id: &str) -> IngestResult<Option<StoredAsset>> {
        let row = sqlx::query_as::<_, AssetRow>(
            r#"
            SELECT id, filename, storage_url, source, labels, external_id
            FROM images
            WHERE external_id = $1
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify_db_error(e, external_id))?;

        Ok(row.map(StoredAsset::from))
    }

    #[instrument(skip(self, asset), fields(external_id = %asset.external_id))]
    async fn insert(&self, asset: NewAsset) -> IngestResult<StoredAsset> {
        let result = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO images (filename, storage_url, source, labels, external_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&asset.filename)
        .bind(&asset.storage_url)
        .bind(&asset.source)
        .bind(&asset.labels)
        .bind(&asset.external_id)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(id) => {
                debug!(id, "Inserted asset metadata");
                Ok(asset.with_id(id))
            },
            Err(e) => Err(classify_db_error(e, &asset.external_id)),
        }
    }
}
