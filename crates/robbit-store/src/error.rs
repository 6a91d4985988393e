use robbit_core::models::{TileKey, TileStatus};
use robbit_core::RobbitError;
use thiserror::Error;

/// Storage error types
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Tile {0} does not exist")]
    TileNotFound(TileKey),

    #[error("Cannot {action} tile {key}: status is {status}, expected to-probe")]
    InvalidTransition { key: TileKey, status: TileStatus, action: &'static str },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Corrupt row in {table}: {reason}")]
    CorruptRow { table: &'static str, reason: String },

    #[error(transparent)]
    Domain(#[from] RobbitError),
}

pub type Result<T> = std::result::Result<T, StoreError>;
