//! In-memory storage implementation for development and testing.
//!
//! This implementation uses `RwLock::unwrap()` intentionally. Lock poisoning
//! only occurs when another thread panicked while holding the lock, which is
//! an unrecoverable state. For production workloads, use the PostgreSQL backend.
//!
//! All state lives behind a single lock so that every multi-row operation
//! (splitting a tile, committing a harvested tile, resetting) is atomic.

use async_trait::async_trait;
use robbit_core::models::{BoundingBox, Image, ScanArea, SplitOutcome, Tile, TileKey, TileStatus};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::error::{Result, StoreError};
use crate::ports::{AreaStore, ImageStore, ResetReport, StatusCount, TileStore};

#[derive(Debug, Default)]
struct MemoryState {
    tiles: HashMap<TileKey, Tile>,
    images: BTreeMap<i64, Image>,
    areas: BTreeMap<String, ScanArea>,
}

/// In-memory implementation of every storage port
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    /// Create a new, empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored image, ordered by external id
    pub fn images(&self) -> Vec<Image> {
        self.state.read().unwrap().images.values().cloned().collect()
    }

    /// Snapshot of every tile, ordered by depth, row, column
    pub fn tiles(&self) -> Vec<Tile> {
        let state = self.state.read().unwrap();
        let mut tiles: Vec<Tile> = state.tiles.values().cloned().collect();
        tiles.sort_by_key(|t| (t.key.depth, t.key.y, t.key.x));
        tiles
    }

    /// Insert or overwrite a tile directly
    pub fn put_tile(&self, tile: Tile) {
        self.state.write().unwrap().tiles.insert(tile.key, tile);
    }
}

#[async_trait]
impl TileStore for MemoryStore {
    async fn ensure_root(&self) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.tiles.entry(TileKey::root()).or_insert_with(Tile::root);
        Ok(())
    }

    async fn get_tile(&self, key: TileKey) -> Result<Option<Tile>> {
        Ok(self.state.read().unwrap().tiles.get(&key).cloned())
    }

    async fn tiles_to_probe(&self, depth: u32) -> Result<Vec<Tile>> {
        let state = self.state.read().unwrap();
        let mut tiles: Vec<Tile> = state
            .tiles
            .values()
            .filter(|t| t.key.depth == depth && t.status == TileStatus::ToProbe)
            .cloned()
            .collect();
        tiles.sort_by_key(|t| (t.key.y, t.key.x));
        Ok(tiles)
    }

    async fn need_children(&self, key: TileKey) -> Result<SplitOutcome> {
        let mut state = self.state.write().unwrap();

        let tile = state.tiles.get(&key).cloned().ok_or(StoreError::TileNotFound(key))?;
        if tile.status != TileStatus::ToProbe {
            return Err(StoreError::InvalidTransition {
                key,
                status: tile.status,
                action: "split",
            });
        }

        let Some(children) = tile.spawn_children() else {
            return Ok(SplitOutcome::MaxDepth);
        };

        for child in children {
            state.tiles.insert(child.key, child);
        }
        if let Some(tile) = state.tiles.get_mut(&key) {
            tile.status = TileStatus::Split;
        }

        Ok(SplitOutcome::Split)
    }

    async fn status_counts(&self) -> Result<Vec<StatusCount>> {
        let state = self.state.read().unwrap();
        let mut counts: BTreeMap<(u32, &'static str), (TileStatus, u64)> = BTreeMap::new();

        for tile in state.tiles.values() {
            counts.entry((tile.key.depth, tile.status.as_str())).or_insert((tile.status, 0)).1 += 1;
        }

        Ok(counts
            .into_iter()
            .map(|((depth, _), (status, count))| StatusCount { depth, status, count })
            .collect())
    }

    async fn reset(&self) -> Result<ResetReport> {
        let mut state = self.state.write().unwrap();

        let before = state.tiles.len() as u64;
        state.tiles.retain(|key, _| key.depth == 0);
        let deleted = before - state.tiles.len() as u64;

        for tile in state.tiles.values_mut() {
            tile.status = TileStatus::ToProbe;
        }

        Ok(ResetReport { deleted, reset: state.tiles.len() as u64 })
    }
}

#[async_trait]
impl ImageStore for MemoryStore {
    async fn existing_ids(&self, ids: &[i64]) -> Result<HashSet<i64>> {
        let state = self.state.read().unwrap();
        Ok(ids.iter().copied().filter(|id| state.images.contains_key(id)).collect())
    }

    async fn commit_tile(&self, key: TileKey, images: Vec<Image>) -> Result<usize> {
        let mut state = self.state.write().unwrap();

        // Validate the transition before touching anything
        match state.tiles.get(&key) {
            None => return Err(StoreError::TileNotFound(key)),
            Some(tile) if tile.status != TileStatus::ToProbe => {
                return Err(StoreError::InvalidTransition {
                    key,
                    status: tile.status,
                    action: "mark contained",
                });
            }
            Some(_) => {}
        }

        let mut inserted = 0;
        for image in images {
            if !state.images.contains_key(&image.external_id) {
                state.images.insert(image.external_id, image);
                inserted += 1;
            }
        }

        if let Some(tile) = state.tiles.get_mut(&key) {
            tile.status = TileStatus::Contained;
        }

        Ok(inserted)
    }

    async fn count_images(&self) -> Result<u64> {
        Ok(self.state.read().unwrap().images.len() as u64)
    }
}

#[async_trait]
impl AreaStore for MemoryStore {
    async fn get_area(&self, name: &str) -> Result<Option<ScanArea>> {
        Ok(self.state.read().unwrap().areas.get(name).cloned())
    }

    async fn put_area(&self, area: &ScanArea) -> Result<()> {
        robbit_geo::validate_area(&area.geometry)?;
        self.state.write().unwrap().areas.insert(area.name.clone(), area.clone());
        Ok(())
    }

    async fn list_areas(&self) -> Result<Vec<String>> {
        Ok(self.state.read().unwrap().areas.keys().cloned().collect())
    }

    async fn area_intersects(&self, name: &str, bbox: &BoundingBox) -> Result<bool> {
        let state = self.state.read().unwrap();
        Ok(state
            .areas
            .get(name)
            .is_some_and(|area| robbit_geo::bbox_intersects_area(bbox, &area.geometry)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use robbit_core::models::{Coordinate, MAX_DEPTH};
    use serde_json::json;

    fn image(id: i64) -> Image {
        Image {
            external_id: id,
            coords: Coordinate::new(1.0, 2.0),
            date_taken: None,
            popularity: 0,
            data: json!({"id": id.to_string()}),
        }
    }

    #[tokio::test]
    async fn test_ensure_root_is_idempotent() {
        let store = MemoryStore::new();
        store.ensure_root().await.unwrap();
        store.ensure_root().await.unwrap();

        assert_eq!(store.tiles(), vec![Tile::root()]);
    }

    #[tokio::test]
    async fn test_need_children_splits_once() {
        let store = MemoryStore::new();
        store.ensure_root().await.unwrap();

        let outcome = store.need_children(TileKey::root()).await.unwrap();
        assert_eq!(outcome, SplitOutcome::Split);

        let root = store.get_tile(TileKey::root()).await.unwrap().unwrap();
        assert_eq!(root.status, TileStatus::Split);

        let children = store.tiles_to_probe(1).await.unwrap();
        assert_eq!(children.len(), 4);
        assert!(children.iter().all(|c| c.parent == Some(TileKey::root())));
        // Row then column
        let order: Vec<(u32, u32)> = children.iter().map(|c| (c.key.x, c.key.y)).collect();
        assert_eq!(order, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);

        // Second call is a precondition violation
        let err = store.need_children(TileKey::root()).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
        assert_eq!(store.tiles().len(), 5);
    }

    #[tokio::test]
    async fn test_need_children_at_max_depth() {
        let store = MemoryStore::new();
        let key = TileKey::new(MAX_DEPTH, 3, 7).unwrap();
        store.put_tile(Tile { key, parent: key.parent(), status: TileStatus::ToProbe });

        assert_eq!(store.need_children(key).await.unwrap(), SplitOutcome::MaxDepth);
        assert_eq!(store.get_tile(key).await.unwrap().unwrap().status, TileStatus::ToProbe);
        assert_eq!(store.tiles().len(), 1);
    }

    #[tokio::test]
    async fn test_commit_tile_skips_existing_ids() {
        let store = MemoryStore::new();
        store.ensure_root().await.unwrap();
        store.need_children(TileKey::root()).await.unwrap();

        let a = TileKey::new(1, 0, 0).unwrap();
        let b = TileKey::new(1, 1, 0).unwrap();

        assert_eq!(store.commit_tile(a, vec![image(1), image(2)]).await.unwrap(), 2);
        assert_eq!(store.commit_tile(b, vec![image(2), image(3)]).await.unwrap(), 1);
        assert_eq!(store.count_images().await.unwrap(), 3);
        assert_eq!(store.get_tile(b).await.unwrap().unwrap().status, TileStatus::Contained);

        let existing = store.existing_ids(&[1, 3, 4]).await.unwrap();
        assert_eq!(existing, HashSet::from([1, 3]));
    }

    #[tokio::test]
    async fn test_commit_tile_rejects_terminal_tile() {
        let store = MemoryStore::new();
        store.ensure_root().await.unwrap();
        store.need_children(TileKey::root()).await.unwrap();

        let err = store.commit_tile(TileKey::root(), vec![image(1)]).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
        // Nothing from the failed unit landed
        assert_eq!(store.count_images().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reset_keeps_images() {
        let store = MemoryStore::new();
        store.ensure_root().await.unwrap();
        store.need_children(TileKey::root()).await.unwrap();
        store.commit_tile(TileKey::new(1, 0, 0).unwrap(), vec![image(1)]).await.unwrap();

        let report = store.reset().await.unwrap();
        assert_eq!(report, ResetReport { deleted: 4, reset: 1 });
        assert_eq!(store.tiles(), vec![Tile::root()]);
        assert_eq!(store.count_images().await.unwrap(), 1);

        // Idempotent
        assert_eq!(store.reset().await.unwrap(), ResetReport { deleted: 0, reset: 1 });
    }

    #[tokio::test]
    async fn test_status_counts() {
        let store = MemoryStore::new();
        store.ensure_root().await.unwrap();
        store.need_children(TileKey::root()).await.unwrap();
        store.commit_tile(TileKey::new(1, 1, 1).unwrap(), vec![]).await.unwrap();

        let counts = store.status_counts().await.unwrap();
        assert_eq!(
            counts,
            vec![
                StatusCount { depth: 0, status: TileStatus::Split, count: 1 },
                StatusCount { depth: 1, status: TileStatus::Contained, count: 1 },
                StatusCount { depth: 1, status: TileStatus::ToProbe, count: 3 },
            ]
        );
    }

    #[tokio::test]
    async fn test_areas() {
        use geo::{polygon, MultiPolygon};

        let store = MemoryStore::new();
        let square = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 0.0)];
        let area = ScanArea::new("square", MultiPolygon::new(vec![square])).unwrap();

        store.put_area(&area).await.unwrap();
        assert_eq!(store.get_area("square").await.unwrap(), Some(area));
        assert_eq!(store.get_area("missing").await.unwrap(), None);
        assert_eq!(store.list_areas().await.unwrap(), vec!["square"]);

        let inside = BoundingBox::new(Coordinate::new(0.2, 0.1), Coordinate::new(0.4, 0.2));
        let touching = BoundingBox::new(Coordinate::new(1.0, 0.0), Coordinate::new(2.0, 1.0));
        let outside = BoundingBox::new(Coordinate::new(5.0, 5.0), Coordinate::new(6.0, 6.0));
        assert!(store.area_intersects("square", &inside).await.unwrap());
        assert!(store.area_intersects("square", &touching).await.unwrap());
        assert!(!store.area_intersects("square", &outside).await.unwrap());
        assert!(!store.area_intersects("missing", &inside).await.unwrap());

        let empty = ScanArea::new("empty", MultiPolygon::new(vec![])).unwrap();
        assert!(store.put_area(&empty).await.is_err());
    }
}
