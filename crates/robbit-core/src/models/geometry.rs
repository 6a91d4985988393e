//! Coordinate and bounding box value types.
//!
//! Both are plain `Copy` values. The bounding box knows how to render itself in the
//! search API's `bbox` syntax and how to become a `geo` polygon for intersection tests.

use geo::{coord, Polygon, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A (longitude, latitude) pair in WGS 84 degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Whether both components are finite and inside the WGS 84 range
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }
}

impl From<Coordinate> for geo::Point<f64> {
    fn from(c: Coordinate) -> Self {
        geo::Point::new(c.lon, c.lat)
    }
}

/// An axis-aligned box: `low` holds the small values, `high` the big ones
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub low: Coordinate,
    pub high: Coordinate,
}

impl BoundingBox {
    pub fn new(low: Coordinate, high: Coordinate) -> Self {
        Self { low, high }
    }

    /// The whole earth
    pub fn world() -> Self {
        Self::new(Coordinate::new(-180.0, -90.0), Coordinate::new(180.0, 90.0))
    }

    pub fn width(&self) -> f64 {
        self.high.lon - self.low.lon
    }

    pub fn height(&self) -> f64 {
        self.high.lat - self.low.lat
    }

    /// Inclusive containment test
    pub fn contains(&self, c: Coordinate) -> bool {
        c.lon >= self.low.lon && c.lon <= self.high.lon && c.lat >= self.low.lat && c.lat <= self.high.lat
    }

    /// Render as `minLon,minLat,maxLon,maxLat`, the search API's bbox syntax
    pub fn to_api_string(&self) -> String {
        format!("{},{},{},{}", self.low.lon, self.low.lat, self.high.lon, self.high.lat)
    }

    /// Materialize as a closed rectangular polygon
    pub fn to_polygon(&self) -> Polygon<f64> {
        Rect::from(*self).to_polygon()
    }
}

impl From<BoundingBox> for Rect<f64> {
    fn from(b: BoundingBox) -> Self {
        Rect::new(
            coord! { x: b.low.lon, y: b.low.lat },
            coord! { x: b.high.lon, y: b.high.lat },
        )
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})-({}, {})", self.low.lon, self.low.lat, self.high.lon, self.high.lat)
    }
}
