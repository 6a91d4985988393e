use crate::cli::StorageBackend;
use anyhow::{anyhow, Context, Result};
use robbit_store::postgres::{PoolConfig, PostgresConfig, PostgresStore};
use robbit_store::{AreaStore, ImageStore, MemoryStore, TileStore};
use std::sync::Arc;

/// Storage adapters shared by the commands
pub struct Storage {
    pub tiles: Arc<dyn TileStore>,
    pub images: Arc<dyn ImageStore>,
    pub areas: Arc<dyn AreaStore>,
}

impl Storage {
    /// Open the selected backend. `pool_size` bounds concurrent database work.
    pub async fn new(backend: StorageBackend, database_url: Option<&str>, pool_size: usize) -> Result<Self> {
        match backend {
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage, progress is lost on exit");
                let store = Arc::new(MemoryStore::new());
                Ok(Self { tiles: store.clone(), images: store.clone(), areas: store })
            }
            StorageBackend::Postgres => {
                let store = Arc::new(connect_postgres(database_url, pool_size, true).await?);
                Ok(Self { tiles: store.clone(), images: store.clone(), areas: store })
            }
        }
    }
}

/// Connect to PostgreSQL, optionally applying pending migrations
pub async fn connect_postgres(database_url: Option<&str>, pool_size: usize, migrate: bool) -> Result<PostgresStore> {
    let url = database_url.ok_or_else(|| {
        anyhow!("No database configured. Set DATABASE_URL or pass --database-url, or use --storage memory")
    })?;

    let mut config = PostgresConfig::new(url).context("Invalid database configuration")?;
    config.pool = PoolConfig::for_concurrency(pool_size);
    config.migrations.auto_run = migrate;

    PostgresStore::new(config).await.map_err(|e| {
        anyhow!(
            "Failed to connect to PostgreSQL: {}\n\n\
             Remediation:\n  \
               1. Ensure PostgreSQL with PostGIS is running\n  \
               2. Check DATABASE_URL or --database-url\n  \
               3. Verify credentials and that the database exists",
            e
        )
    })
}
