//! PIX Ingest Library
//!
//! Pulls one batch of photos from Unsplash, skips the ones already ingested,
//! stores the content in S3 under a content-addressed key and records the
//! metadata in PostgreSQL.
//!
//! # Components
//!
//! - [`provider`]: Unsplash batch fetch and content download
//! - [`dedup`]: duplicate check keyed on the provider id
//! - [`naming`]: content-addressed filenames and storage keys
//! - [`storage`]: blob store trait and the S3 implementation
//! - [`db`]: asset repository trait and the PostgreSQL implementation
//! - [`pipeline`]: the per-record state machine tying them together
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pix_ingest::{
//!     config::IngestConfig,
//!     db::{self, PgAssetRepository},
//!     pipeline::IngestPipeline,
//!     provider::UnsplashClient,
//!     storage::S3BlobStore,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::load()?;
//!     let pool = db::create_pool(&config.database).await?;
//!
//!     let pipeline = IngestPipeline::new(
//!         Arc::new(UnsplashClient::new(&config.provider)?),
//!         Arc::new(S3BlobStore::new(config.storage.clone()).await?),
//!         Arc::new(PgAssetRepository::new(pool)),
//!         config.pipeline.clone(),
//!     );
//!
//!     let report = pipeline.run(&config.provider.query, config.provider.count).await?;
//!     println!("ingested {} of {}", report.ingested, report.total);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod db;
pub mod dedup;
pub mod error;
pub mod naming;
pub mod pipeline;
pub mod provider;
pub mod storage;

// Re-export commonly used types
pub use error::{IngestError, IngestResult};
