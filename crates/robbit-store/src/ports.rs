use async_trait::async_trait;
use robbit_core::models::{BoundingBox, Image, ScanArea, SplitOutcome, Tile, TileKey, TileStatus};
use std::collections::HashSet;

use crate::error::Result;

/// Number of tiles sharing a depth and a status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCount {
    pub depth: u32,
    pub status: TileStatus,
    pub count: u64,
}

/// What a reset removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResetReport {
    /// Tiles deleted (everything below the root level)
    pub deleted: u64,
    /// Root tiles put back to `to-probe`
    pub reset: u64,
}

/// Port for the quadtree tile index
#[async_trait]
pub trait TileStore: Send + Sync {
    /// Create the depth-0 tile if it does not exist yet
    async fn ensure_root(&self) -> Result<()>;

    /// Get a tile by key
    async fn get_tile(&self, key: TileKey) -> Result<Option<Tile>>;

    /// Tiles at `depth` still `to-probe`, ordered by row then column
    async fn tiles_to_probe(&self, depth: u32) -> Result<Vec<Tile>>;

    /// Create the four children of a `to-probe` tile and mark it `split`, atomically.
    ///
    /// Returns [`SplitOutcome::MaxDepth`] without touching anything when the tile is
    /// already at the deepest level. Fails with `InvalidTransition` if the tile is
    /// not `to-probe`.
    async fn need_children(&self, key: TileKey) -> Result<SplitOutcome>;

    /// Tile counts grouped by depth and status, ordered by depth
    async fn status_counts(&self) -> Result<Vec<StatusCount>>;

    /// Delete every non-root tile and put the roots back to `to-probe`.
    ///
    /// Harvested images are kept.
    async fn reset(&self) -> Result<ResetReport>;
}

/// Port for harvested images
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Which of `ids` are already stored
    async fn existing_ids(&self, ids: &[i64]) -> Result<HashSet<i64>>;

    /// Persist a harvested tile as one atomic unit: skip images whose id is already
    /// stored, insert the rest, mark the tile `contained`. Either everything lands
    /// or nothing does. Returns the number of images inserted.
    async fn commit_tile(&self, key: TileKey, images: Vec<Image>) -> Result<usize>;

    /// Total number of stored images
    async fn count_images(&self) -> Result<u64>;
}

/// Port for named scan areas
#[async_trait]
pub trait AreaStore: Send + Sync {
    async fn get_area(&self, name: &str) -> Result<Option<ScanArea>>;

    /// Insert or replace an area by name
    async fn put_area(&self, area: &ScanArea) -> Result<()>;

    /// All area names, sorted
    async fn list_areas(&self) -> Result<Vec<String>>;

    /// Whether `bbox` intersects the named area; touching boundaries count.
    ///
    /// Unknown areas intersect nothing.
    async fn area_intersects(&self, name: &str, bbox: &BoundingBox) -> Result<bool>;
}
