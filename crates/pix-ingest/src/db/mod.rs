//! Metadata store: connection pool setup and the asset repository

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::error::{IngestError, IngestResult};

pub mod assets;

pub use assets::{AssetRepository, PgAssetRepository};

/// Default pool size; the pipeline issues one query at a time.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 2;

pub const DEFAULT_DB_CONNECT_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_PG_PORT: u16 = 5432;

#[derive(Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
    pub run_migrations: bool,
}

impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("url", &redact_url(&self.url))
            .field("max_connections", &self.max_connections)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("run_migrations", &self.run_migrations)
            .finish()
    }
}

impl DbConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            connect_timeout_secs: DEFAULT_DB_CONNECT_TIMEOUT_SECS,
            run_migrations: true,
        }
    }

    /// Read `DATABASE_URL`, or assemble it from `PG_HOST`, `PG_PORT`,
    /// `PG_USER`, `PG_PASS` and `PG_DB`.
    pub fn from_env() -> IngestResult<Self> {
        let url = match std::env::var("DATABASE_URL") {
            Ok(url) if !url.is_empty() => url,
            _ => url_from_parts()?,
        };

        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);

        let connect_timeout_secs = std::env::var("DB_CONNECT_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DB_CONNECT_TIMEOUT_SECS);

        let run_migrations = std::env::var("DB_RUN_MIGRATIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(true);

        Ok(Self {
            url,
            max_connections,
            connect_timeout_secs,
            run_migrations,
        })
    }

    pub fn validate(&self) -> IngestResult<()> {
        if self.url.is_empty() {
            return Err(IngestError::Config("Database URL cannot be empty".to_string()));
        }
        if self.max_connections == 0 {
            return Err(IngestError::Config(
                "Database max_connections must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn url_from_parts() -> IngestResult<String> {
    let var = |name: &str| {
        std::env::var(name)
            .map_err(|_| IngestError::Config(format!("DATABASE_URL not set and {} missing", name)))
    };

    let host = var("PG_HOST")?;
    let user = var("PG_USER")?;
    let password = var("PG_PASS")?;
    let database = var("PG_DB")?;
    let port = std::env::var("PG_PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PG_PORT);

    Ok(format!(
        "postgresql://{}:{}@{}:{}/{}",
        user, password, host, port, database
    ))
}

/// Hide the password component of a connection URL for logging
fn redact_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("***"));
            parsed.to_string()
        },
        Ok(parsed) => parsed.to_string(),
        Err(_) => "<unparseable>".to_string(),
    }
}

pub async fn create_pool(config: &DbConfig) -> IngestResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect(&config.url)
        .await
        .map_err(|e| IngestError::StoreUnavailable(e.to_string()))?;

    tracing::info!(
        max_connections = config.max_connections,
        url = %redact_url(&config.url),
        "Database connection pool created"
    );

    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> IngestResult<()> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| IngestError::StoreUnavailable(format!("Failed to run migrations: {}", e)))?;

    tracing::info!("Database migrations completed");
    Ok(())
}

pub async fn health_check(pool: &PgPool) -> IngestResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(|e| IngestError::StoreUnavailable(e.to_string()))
}
