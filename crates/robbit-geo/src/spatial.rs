use geo::algorithm::intersects::Intersects;
use geo::MultiPolygon;
use robbit_core::models::BoundingBox;

/// Whether a bounding box touches the area. Shared edges count as intersecting.
pub fn bbox_intersects_area(bbox: &BoundingBox, area: &MultiPolygon<f64>) -> bool {
    bbox.to_polygon().intersects(area)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use robbit_core::models::{ScanArea, TileKey};

    fn tile_intersects_area(key: &TileKey, area: &ScanArea) -> bool {
        bbox_intersects_area(&key.bbox(), &area.geometry)
    }

    fn paris() -> ScanArea {
        let poly = polygon![
            (x: 2.2, y: 48.8),
            (x: 2.5, y: 48.8),
            (x: 2.5, y: 48.95),
            (x: 2.2, y: 48.95),
            (x: 2.2, y: 48.8),
        ];
        ScanArea::new("paris", MultiPolygon::new(vec![poly])).unwrap()
    }

    #[test]
    fn test_root_intersects_everything() {
        assert!(tile_intersects_area(&TileKey::root(), &paris()));
    }

    #[test]
    fn test_quadrants() {
        let area = paris();
        // North-east quadrant at depth 1 holds Paris, south-west does not
        assert!(tile_intersects_area(&TileKey::new(1, 1, 1).unwrap(), &area));
        assert!(!tile_intersects_area(&TileKey::new(1, 0, 0).unwrap(), &area));
        assert!(!tile_intersects_area(&TileKey::new(1, 0, 1).unwrap(), &area));
    }

    #[test]
    fn test_touching_edge_counts() {
        let square = polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
            (x: 0.0, y: 0.0),
        ];
        let area = MultiPolygon::new(vec![square]);
        let west = BoundingBox::new(
            robbit_core::models::Coordinate::new(-10.0, 0.0),
            robbit_core::models::Coordinate::new(0.0, 10.0),
        );
        assert!(bbox_intersects_area(&west, &area));
    }

    #[test]
    fn test_empty_area_intersects_nothing() {
        let area = ScanArea::new("empty", MultiPolygon::new(vec![])).unwrap();
        assert!(!tile_intersects_area(&TileKey::root(), &area));
    }
}
