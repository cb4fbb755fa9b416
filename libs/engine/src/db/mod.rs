//! Database layer - store traits, the Postgres store and the in-memory store

pub mod expansions;
pub mod memory;
pub mod terminology;
pub mod traits;
pub mod value_sets;

pub use memory::MemoryStore;
pub use traits::{
    ConceptStore, ExpansionStore, RxNormStore, SnomedStore, TerminologyQueryService,
    ValueSetStore,
};

use crate::{config::DatabaseConfig, Error, Result};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::str::FromStr;
use std::time::Duration;

/// Postgres implementation of every store trait
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Open a connection pool, applying the configured statement timeout to every connection.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    let statement_timeout_ms = config.statement_timeout_seconds.saturating_mul(1000);
    let options = PgConnectOptions::from_str(&config.url)
        .map_err(Error::Database)?
        .options([("statement_timeout", statement_timeout_ms.to_string())]);

    let pool = PgPoolOptions::new()
        .min_connections(config.pool_min_size)
        .max_connections(config.pool_max_size)
        .acquire_timeout(Duration::from_secs(config.pool_timeout_seconds))
        .connect_with(options)
        .await
        .map_err(Error::Database)?;

    tracing::info!(
        max_connections = config.pool_max_size,
        statement_timeout_ms,
        "Database pool ready"
    );

    if config.run_migrations {
        migrate(&pool).await?;
    }

    Ok(pool)
}

/// Apply pending schema migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}
