//! PIX Ingest - one-shot photo ingestion

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pix_common::logging::{init_logging, LogConfig, LogLevel};
use pix_ingest::{
    config::IngestConfig,
    db::{self, PgAssetRepository},
    pipeline::IngestPipeline,
    provider::UnsplashClient,
    storage::S3BlobStore,
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "pix-ingest")]
#[command(author, version, about = "Ingest a batch of Unsplash photos into S3 and PostgreSQL")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch one batch and ingest every new photo (default)
    Run(RunArgs),
}

#[derive(clap::Args, Debug, Default)]
struct RunArgs {
    /// Search term, overrides UNSPLASH_QUERY
    #[arg(short, long)]
    query: Option<String>,

    /// Batch size, overrides UNSPLASH_COUNT
    #[arg(short, long)]
    count: Option<u32>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("pix-ingest")
        .filter_directives("sqlx=warn,aws_config=warn,aws_smithy_runtime=warn,hyper=warn")
        .build();

    // Environment variables take precedence over the flags above
    let log_config = match log_config.merge_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid logging configuration: {:#}", e);
            return ExitCode::FAILURE;
        },
    };

    let _log_guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            return ExitCode::FAILURE;
        },
    };

    let args = match cli.command {
        Some(Command::Run(args)) => args,
        None => RunArgs::default(),
    };

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Ingestion aborted");
            ExitCode::FAILURE
        },
    }
}

/// Returns `Ok(false)` when the batch completed but some records failed
async fn run(args: RunArgs) -> Result<bool> {
    let config = IngestConfig::load()
        .and_then(|config| config.with_overrides(args.query, args.count))
        .context("Failed to load configuration")?;

    info!(
        query = %config.provider.query,
        count = config.provider.count,
        bucket = %config.storage.bucket,
        "Starting ingestion"
    );

    let pool = db::create_pool(&config.database)
        .await
        .context("Failed to connect to metadata store")?;
    db::health_check(&pool)
        .await
        .context("Metadata store health check failed")?;

    if config.database.run_migrations {
        db::run_migrations(&pool).await?;
    }

    let repository = Arc::new(PgAssetRepository::new(pool));
    let storage = S3BlobStore::new(config.storage.clone())
        .await
        .context("Failed to initialize blob storage")?;
    let provider = UnsplashClient::new(&config.provider)?;

    let pipeline = IngestPipeline::new(
        Arc::new(provider),
        Arc::new(storage),
        repository.clone(),
        config.pipeline.clone(),
    );

    let report = pipeline
        .run(&config.provider.query, config.provider.count)
        .await?;

    let stored_total = repository.count_best_effort().await;
    info!(
        ingested = report.ingested,
        skipped = report.skipped,
        failed = report.failed,
        stored_total = ?stored_total,
        "Ingestion complete"
    );

    Ok(!report.has_failures())
}
