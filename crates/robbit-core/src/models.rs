pub mod area;
pub mod geometry;
pub mod image;
pub mod search;
pub mod tile;

pub use area::ScanArea;
pub use geometry::{BoundingBox, Coordinate};
pub use image::Image;
pub use search::{PhotoRecord, SearchPage};
pub use tile::{SplitOutcome, Tile, TileKey, TileStatus, MAX_DEPTH};
