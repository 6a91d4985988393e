//! Robbit Scan - Quadtree scan orchestration
//!
//! The [`Scanner`] walks the tile quadtree level by level. Every `to-probe` tile
//! intersecting the scan area is either split, when the search reports more
//! results than a single query can page through, or harvested and marked
//! `contained`.

pub mod error;
pub mod observer;
pub mod records;
pub mod report;
pub mod scanner;

pub use error::{Result, ScanError};
pub use observer::{NoopObserver, ScanObserver};
pub use records::{collect_images, Harvest};
pub use report::{LevelSummary, ScanReport, TileOutcome};
pub use scanner::Scanner;
