//! PostgreSQL configuration

use std::time::Duration;
use thiserror::Error;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(String),

    #[error("Invalid configuration value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

/// PostgreSQL connection and behavior configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Connection pool configuration
    pub pool: PoolConfig,
    /// Migration configuration
    pub migrations: MigrationConfig,
    /// Upper bound on commit/rollback of a tile transaction
    pub transaction_timeout: Duration,
}

impl PostgresConfig {
    /// Load configuration from the `DATABASE_URL` environment variable.
    ///
    /// Other settings use defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::Missing("DATABASE_URL".to_string()))?;
        Self::new(database_url)
    }

    /// Create a new configuration with the given database URL
    pub fn new(database_url: impl Into<String>) -> Result<Self, ConfigError> {
        let config = Self {
            database_url: database_url.into(),
            pool: PoolConfig::default(),
            migrations: MigrationConfig::default(),
            transaction_timeout: Duration::from_secs(30),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "database_url".to_string(),
                reason: "cannot be empty".to_string(),
            });
        }

        if self.transaction_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "transaction_timeout".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        self.pool.validate()
    }
}

/// Connection pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub min_connections: u32,
    pub max_connections: u32,
    /// Timeout for acquiring a connection from the pool
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: 1,
            max_connections: 16,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

impl PoolConfig {
    /// Size the pool for a scan running `concurrency` tiles at once
    pub fn for_concurrency(concurrency: usize) -> Self {
        let max = u32::try_from(concurrency).unwrap_or(u32::MAX).saturating_add(2);
        Self { max_connections: max.max(Self::default().max_connections), ..Self::default() }
    }

    /// Validate pool configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "pool.max_connections".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::Invalid {
                key: "pool.min_connections".to_string(),
                reason: format!(
                    "min_connections ({}) cannot be greater than max_connections ({})",
                    self.min_connections, self.max_connections
                ),
            });
        }

        Ok(())
    }
}

/// Migration configuration
#[derive(Debug, Clone, Default)]
pub struct MigrationConfig {
    /// Run pending migrations when the store connects
    pub auto_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new_valid() {
        let config = PostgresConfig::new("postgresql://localhost/robbit").unwrap();
        assert_eq!(config.transaction_timeout, Duration::from_secs(30));
        assert!(!config.migrations.auto_run);
    }

    #[test]
    fn test_config_new_empty_url() {
        match PostgresConfig::new("  ") {
            Err(ConfigError::Invalid { key, .. }) => assert_eq!(key, "database_url"),
            other => panic!("Expected Invalid error, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = PostgresConfig::new("postgresql://localhost/robbit").unwrap();
        config.transaction_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pool_config_invalid_min_max() {
        let pool = PoolConfig { min_connections: 20, max_connections: 10, ..PoolConfig::default() };
        assert!(pool.validate().is_err());

        let pool = PoolConfig { min_connections: 0, max_connections: 0, ..PoolConfig::default() };
        assert!(pool.validate().is_err());
    }

    #[test]
    fn test_pool_for_concurrency() {
        assert_eq!(PoolConfig::for_concurrency(3).max_connections, 16);
        assert_eq!(PoolConfig::for_concurrency(30).max_connections, 32);
        assert!(PoolConfig::for_concurrency(30).validate().is_ok());
    }
}
