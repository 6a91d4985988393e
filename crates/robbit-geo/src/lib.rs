//! Robbit Geo - Geometry conversions and spatial predicates
//!
//! This crate bridges the tile and area models with the `geo` crate: GeoJSON area
//! parsing, area validation and tile-versus-area intersection.

pub mod models;
pub mod spatial;
pub mod validation;

pub use models::{multipolygon_from_geojson, multipolygon_to_geojson};
pub use spatial::bbox_intersects_area;
pub use validation::validate_area;
