//! GeoJSON conversions for scan area geometries.
//!
//! Areas are always held as a `MultiPolygon`: a GeoJSON Polygon becomes a one-member
//! MultiPolygon, Features and FeatureCollections contribute all their polygonal members.

use geo::{Geometry as GeoGeometry, MultiPolygon, Polygon};
use geojson::GeoJson;
use robbit_core::error::{Result, RobbitError};

/// Parse a GeoJSON document into a MultiPolygon
pub fn multipolygon_from_geojson(content: &str) -> Result<MultiPolygon<f64>> {
    let geojson: GeoJson = content.parse().map_err(|e| RobbitError::InvalidGeometry {
        reason: format!("Failed to parse GeoJSON: {}", e),
    })?;

    let mut polygons = Vec::new();

    match geojson {
        GeoJson::Geometry(geometry) => collect_polygons(geometry.value, &mut polygons)?,
        GeoJson::Feature(feature) => {
            let geometry = feature.geometry.ok_or_else(|| RobbitError::InvalidGeometry {
                reason: "Feature has no geometry".to_string(),
            })?;
            collect_polygons(geometry.value, &mut polygons)?;
        }
        GeoJson::FeatureCollection(collection) => {
            for (idx, feature) in collection.features.into_iter().enumerate() {
                let geometry = feature.geometry.ok_or_else(|| RobbitError::InvalidGeometry {
                    reason: format!("Feature {} has no geometry", idx),
                })?;
                collect_polygons(geometry.value, &mut polygons)?;
            }
        }
    }

    if polygons.is_empty() {
        return Err(RobbitError::InvalidGeometry {
            reason: "GeoJSON contains no polygon".to_string(),
        });
    }

    Ok(MultiPolygon::new(polygons))
}

fn collect_polygons(value: geojson::Value, out: &mut Vec<Polygon<f64>>) -> Result<()> {
    let geometry = GeoGeometry::<f64>::try_from(value).map_err(|e| RobbitError::InvalidGeometry {
        reason: format!("Unsupported geometry: {}", e),
    })?;

    match geometry {
        GeoGeometry::Polygon(p) => out.push(p),
        GeoGeometry::MultiPolygon(mp) => out.extend(mp.0),
        GeoGeometry::Rect(r) => out.push(r.to_polygon()),
        GeoGeometry::GeometryCollection(gc) => {
            for member in gc.0 {
                match member {
                    GeoGeometry::Polygon(p) => out.push(p),
                    GeoGeometry::MultiPolygon(mp) => out.extend(mp.0),
                    other => return Err(not_polygonal(&other)),
                }
            }
        }
        other => return Err(not_polygonal(&other)),
    }

    Ok(())
}

fn not_polygonal(geometry: &GeoGeometry<f64>) -> RobbitError {
    let kind = match geometry {
        GeoGeometry::Point(_) => "Point",
        GeoGeometry::Line(_) => "Line",
        GeoGeometry::LineString(_) => "LineString",
        GeoGeometry::MultiPoint(_) => "MultiPoint",
        GeoGeometry::MultiLineString(_) => "MultiLineString",
        GeoGeometry::Triangle(_) => "Triangle",
        _ => "GeometryCollection",
    };
    RobbitError::InvalidGeometry {
        reason: format!("Areas must be polygonal, found {}", kind),
    }
}

/// Serialize a MultiPolygon as a GeoJSON geometry string (for `ST_GeomFromGeoJSON`)
pub fn multipolygon_to_geojson(geometry: &MultiPolygon<f64>) -> String {
    geojson::Geometry::new(geojson::Value::from(geometry)).to_string()
}
