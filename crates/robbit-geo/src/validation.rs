use geo::{LineString, MultiPolygon};
use robbit_core::error::{Result, RobbitError};

/// Validation result with details
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Validation error with location details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub location: String,
    pub reason: String,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self { is_valid: true, errors: Vec::new() }
    }

    pub fn add_error(&mut self, location: String, reason: String) {
        self.is_valid = false;
        self.errors.push(ValidationError { location, reason });
    }
}

/// Check an area geometry ring by ring
pub fn check_area(area: &MultiPolygon<f64>) -> ValidationResult {
    let mut result = ValidationResult::valid();

    if area.0.is_empty() {
        result.add_error("MultiPolygon".to_string(), "Area has no polygon".to_string());
        return result;
    }

    for (p, polygon) in area.0.iter().enumerate() {
        check_ring(&format!("Polygon[{}].exterior", p), polygon.exterior(), &mut result);
        for (i, ring) in polygon.interiors().iter().enumerate() {
            check_ring(&format!("Polygon[{}].interior[{}]", p, i), ring, &mut result);
        }
    }

    result
}

fn check_ring(location: &str, ring: &LineString<f64>, result: &mut ValidationResult) {
    // A closed ring needs three distinct points plus the closing one
    if ring.0.len() < 4 {
        result.add_error(
            location.to_string(),
            format!("Ring must have at least 4 points, found {}", ring.0.len()),
        );
        return;
    }

    if !ring.is_closed() {
        result.add_error(location.to_string(), "Ring is not closed".to_string());
    }

    for (i, c) in ring.0.iter().enumerate() {
        let in_range = c.x.is_finite()
            && c.y.is_finite()
            && (-180.0..=180.0).contains(&c.x)
            && (-90.0..=90.0).contains(&c.y);
        if !in_range {
            result.add_error(
                format!("{}[{}]", location, i),
                format!("({}, {}) is not a WGS 84 coordinate", c.x, c.y),
            );
        }
    }
}

/// Reject areas that cannot be scanned
pub fn validate_area(area: &MultiPolygon<f64>) -> Result<()> {
    let result = check_area(area);
    if result.is_valid {
        return Ok(());
    }

    let reason = result
        .errors
        .iter()
        .map(|e| format!("{}: {}", e.location, e.reason))
        .collect::<Vec<_>>()
        .join("; ");
    Err(RobbitError::InvalidGeometry { reason })
}
