//! Robbit Core - Domain models, errors, and configuration
//!
//! This crate contains the quadtree tile model, the harvested image model and the
//! layered configuration shared by every other robbit crate.

pub mod config;
pub mod error;
pub mod models;

pub use error::{Result, RobbitError};
