//! Robbit Store - Storage ports and adapters
//!
//! This crate defines the tile, image and area storage ports and provides an
//! in-memory adapter plus a PostgreSQL/PostGIS adapter.

pub mod error;
pub mod memory;
pub mod ports;
pub mod postgres;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use ports::{AreaStore, ImageStore, ResetReport, StatusCount, TileStore};
