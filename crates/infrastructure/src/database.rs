//! Connection pool lifecycle.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use tally_core::{AppError, AppResult};
use tracing::info;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Pool settings for one database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL.
    pub url: String,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
    /// How long an acquire may wait for a free connection.
    pub acquire_timeout: Duration,
}

/// Owned handle to the process's connection pool.
///
/// Created once at startup, passed to the adapters, and closed on exit.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Opens the pool.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(config.url.as_str())
            .await
            .map_err(|error| {
                AppError::DataAccess(format!("failed to connect to database: {error}"))
            })?;

        info!(
            max_connections = config.max_connections,
            "database pool opened"
        );

        Ok(Self { pool })
    }

    /// Applies pending schema migrations.
    pub async fn run_migrations(&self) -> AppResult<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|error| AppError::DataAccess(format!("failed to run migrations: {error}")))?;

        info!("database migrations applied successfully");
        Ok(())
    }

    /// Returns the pool for constructing adapters.
    #[must_use]
    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }

    /// Waits for checked-out connections and closes the pool.
    pub async fn close(self) {
        self.pool.close().await;
        info!("database pool closed");
    }
}
