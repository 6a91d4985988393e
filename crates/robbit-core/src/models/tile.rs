//! The global quadtree of tiles.
//!
//! A tile is identified by its depth and its grid position at that depth. The grid at
//! depth `d` splits the `[-180,180]×[-90,90]` extent into `2^d` columns and `2^d` rows,
//! so the bounding box is derived from the key alone and never stored.
//!
//! `MAX_DEPTH` keeps degenerate hot spots (lots of photos geotagged at exactly 0,0) from
//! recursing forever: at depth 19 a tile is well under a thousandth of a degree wide,
//! any area that still overflows there stands out anyway.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::geometry::{BoundingBox, Coordinate};
use crate::error::{Result, RobbitError};

/// Deepest level a tile may live at
pub const MAX_DEPTH: u32 = 19;

/// Identity of a tile in the quadtree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileKey {
    pub depth: u32,
    pub x: u32,
    pub y: u32,
}

impl TileKey {
    /// Build a key, checking depth and grid bounds
    pub fn new(depth: u32, x: u32, y: u32) -> Result<Self> {
        let key = Self { depth, x, y };

        if depth > MAX_DEPTH {
            return Err(RobbitError::InvalidTile {
                key,
                reason: format!("depth must be within 0..={}", MAX_DEPTH),
            });
        }

        let side = 1u32 << depth;
        if x >= side || y >= side {
            return Err(RobbitError::InvalidTile {
                key,
                reason: format!("grid coordinates must be below {} at this depth", side),
            });
        }

        Ok(key)
    }

    /// The single whole-earth tile
    pub const fn root() -> Self {
        Self { depth: 0, x: 0, y: 0 }
    }

    /// Number of columns (and rows) of the grid at this key's depth
    pub fn grid_size(&self) -> u32 {
        1 << self.depth
    }

    pub fn bbox(&self) -> BoundingBox {
        let splits = 2.0f64.powi(self.depth as i32);
        let dx = 360.0 / splits;
        let dy = 180.0 / splits;
        let (x, y) = (self.x as f64, self.y as f64);

        BoundingBox::new(
            Coordinate::new(-180.0 + x * dx, -90.0 + y * dy),
            Coordinate::new(-180.0 + (x + 1.0) * dx, -90.0 + (y + 1.0) * dy),
        )
    }

    /// Whether children may still be generated below this tile
    pub fn can_split(&self) -> bool {
        self.depth < MAX_DEPTH
    }

    /// The four keys quartering this tile, `None` at `MAX_DEPTH`.
    ///
    /// Order is `(2x,2y)`, `(2x+1,2y)`, `(2x+1,2y+1)`, `(2x,2y+1)`.
    pub fn children(&self) -> Option<[TileKey; 4]> {
        if !self.can_split() {
            return None;
        }

        let depth = self.depth + 1;
        let (x2, y2) = (self.x * 2, self.y * 2);

        Some([
            TileKey { depth, x: x2, y: y2 },
            TileKey { depth, x: x2 + 1, y: y2 },
            TileKey { depth, x: x2 + 1, y: y2 + 1 },
            TileKey { depth, x: x2, y: y2 + 1 },
        ])
    }

    pub fn parent(&self) -> Option<TileKey> {
        if self.depth == 0 {
            return None;
        }
        Some(TileKey { depth: self.depth - 1, x: self.x / 2, y: self.y / 2 })
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.depth, self.x, self.y)
    }
}

/// Scan state of a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TileStatus {
    /// A first API call must be done to know if the tile needs splitting
    #[default]
    ToProbe,
    /// All pictures of this tile have been harvested
    Contained,
    /// Children must be inspected instead
    Split,
}

impl TileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TileStatus::ToProbe => "to-probe",
            TileStatus::Contained => "contained",
            TileStatus::Split => "split",
        }
    }
}

impl fmt::Display for TileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TileStatus {
    type Err = RobbitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "to-probe" => Ok(TileStatus::ToProbe),
            "contained" => Ok(TileStatus::Contained),
            "split" => Ok(TileStatus::Split),
            other => Err(RobbitError::UnknownStatus(other.to_string())),
        }
    }
}

/// Result of asking a tile for children
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitOutcome {
    /// Four children were created and the tile is now `split`
    Split,
    /// The tile sits at `MAX_DEPTH`; nothing changed
    MaxDepth,
}

impl SplitOutcome {
    pub fn is_split(&self) -> bool {
        matches!(self, SplitOutcome::Split)
    }
}

/// A node of the quadtree as held by a tile store.
///
/// `parent` is a lookup key, not an owning reference: the store owns every tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub key: TileKey,
    pub parent: Option<TileKey>,
    pub status: TileStatus,
}

impl Tile {
    pub fn root() -> Self {
        Self { key: TileKey::root(), parent: None, status: TileStatus::ToProbe }
    }

    pub fn bbox(&self) -> BoundingBox {
        self.key.bbox()
    }

    /// Fresh `to-probe` children of this tile, `None` at `MAX_DEPTH`
    pub fn spawn_children(&self) -> Option<[Tile; 4]> {
        let keys = self.key.children()?;
        Some(keys.map(|key| Tile { key, parent: Some(self.key), status: TileStatus::ToProbe }))
    }
}
