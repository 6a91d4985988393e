//! PostgreSQL/PostGIS storage adapter

pub mod areas;
pub mod config;
pub mod images;
pub mod migrations;
pub mod tiles;
pub mod transaction;

pub use config::{ConfigError, MigrationConfig, PoolConfig, PostgresConfig};
pub use migrations::{MigrationManager, MigrationStatus};
pub use transaction::{Transaction, TransactionManager};

use robbit_core::RobbitError;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::error::Result;

/// PostgreSQL storage adapter implementing every storage port
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    config: PostgresConfig,
    transactions: TransactionManager,
}

impl PostgresStore {
    /// Connect with the given configuration
    pub async fn new(config: PostgresConfig) -> Result<Self> {
        config.validate().map_err(|e| RobbitError::ConfigInvalid {
            key: "database_url".to_string(),
            reason: e.to_string(),
        })?;

        let pool = PgPoolOptions::new()
            .min_connections(config.pool.min_connections)
            .max_connections(config.pool.max_connections)
            .acquire_timeout(config.pool.acquire_timeout)
            .idle_timeout(config.pool.idle_timeout)
            .max_lifetime(config.pool.max_lifetime)
            .connect(&config.database_url)
            .await?;

        sqlx::query("SELECT 1").execute(&pool).await?;
        tracing::debug!(max_connections = config.pool.max_connections, "Connected to PostgreSQL");

        let transactions = TransactionManager::new(pool.clone(), config.transaction_timeout);
        let store = Self { pool, config, transactions };

        if store.config.migrations.auto_run {
            store.run_migrations().await?;
        }

        Ok(store)
    }

    /// Connect and run pending migrations
    pub async fn with_migrations(mut config: PostgresConfig) -> Result<Self> {
        config.migrations.auto_run = true;
        Self::new(config).await
    }

    /// Run all pending migrations
    pub async fn run_migrations(&self) -> Result<()> {
        MigrationManager::new(self.pool.clone()).run_migrations().await?;
        tracing::info!("Database schema is up to date");
        Ok(())
    }

    pub async fn migration_status(&self) -> Result<Vec<MigrationStatus>> {
        MigrationManager::new(self.pool.clone()).check_status().await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn config(&self) -> &PostgresConfig {
        &self.config
    }

    /// Perform a health check on the database connection
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub(crate) async fn begin(&self) -> Result<Transaction> {
        self.transactions.begin().await
    }
}
