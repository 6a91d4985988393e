use sqlx::{PgConnection, PgPool, Postgres, Transaction as SqlxTransaction};
use std::time::Duration;
use tokio::time::timeout;

use crate::error::{Result, StoreError};

/// Transaction wrapper with a bounded commit and rollback
pub struct Transaction {
    inner: Option<SqlxTransaction<'static, Postgres>>,
    timeout_duration: Duration,
}

impl Transaction {
    /// Connection to run statements inside the transaction
    pub fn conn(&mut self) -> Result<&mut PgConnection> {
        self.inner
            .as_deref_mut()
            .ok_or_else(|| StoreError::Transaction("Transaction already completed".to_string()))
    }

    /// Commit the transaction, making all changes permanent
    pub async fn commit(mut self) -> Result<()> {
        let tx = self.take()?;
        match timeout(self.timeout_duration, tx.commit()).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::Transaction(format!(
                "Transaction commit timeout after {}s",
                self.timeout_duration.as_secs()
            ))),
        }
    }

    /// Rollback the transaction, discarding all changes
    pub async fn rollback(mut self) -> Result<()> {
        let tx = self.take()?;
        match timeout(self.timeout_duration, tx.rollback()).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::Transaction(format!(
                "Transaction rollback timeout after {}s",
                self.timeout_duration.as_secs()
            ))),
        }
    }

    fn take(&mut self) -> Result<SqlxTransaction<'static, Postgres>> {
        self.inner
            .take()
            .ok_or_else(|| StoreError::Transaction("Transaction already completed".to_string()))
    }
}

// Dropping without commit rolls back: sqlx does it when the inner transaction is dropped.

/// Begins transactions with a default timeout
#[derive(Debug, Clone)]
pub struct TransactionManager {
    pool: PgPool,
    default_timeout: Duration,
}

impl TransactionManager {
    pub fn new(pool: PgPool, default_timeout: Duration) -> Self {
        Self { pool, default_timeout }
    }

    pub async fn begin(&self) -> Result<Transaction> {
        let tx = self.pool.begin().await?;
        Ok(Transaction { inner: Some(tx), timeout_duration: self.default_timeout })
    }
}
