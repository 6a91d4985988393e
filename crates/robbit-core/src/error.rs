//! Error types for Robbit

use std::path::PathBuf;
use thiserror::Error;

use crate::models::TileKey;

#[derive(Debug, Error)]
pub enum RobbitError {
    // Tile errors
    #[error("Tile {key} is out of range: {reason}")]
    InvalidTile { key: TileKey, reason: String },

    #[error("Unknown tile status: {0}")]
    UnknownStatus(String),

    // Area errors
    #[error("Invalid area name \"{name}\": {reason}")]
    InvalidAreaName { name: String, reason: String },

    #[error("Invalid geometry: {reason}")]
    InvalidGeometry { reason: String },

    // Record errors
    #[error("Malformed photo record {id}: {reason}")]
    MalformedRecord { id: String, reason: String },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    #[error("Configuration file not found at {path}")]
    ConfigNotFound { path: PathBuf },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RobbitError>;
