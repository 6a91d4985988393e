//! Named scan areas

use geo::MultiPolygon;

use crate::error::{Result, RobbitError};

/// A named region restricting which tiles are worth probing
#[derive(Debug, Clone, PartialEq)]
pub struct ScanArea {
    /// Unique slug
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

impl ScanArea {
    /// Create an area, rejecting names that are not slugs
    pub fn new(name: impl Into<String>, geometry: MultiPolygon<f64>) -> Result<Self> {
        let name = name.into();
        validate_slug(&name)?;
        Ok(Self { name, geometry })
    }
}

/// A slug is non-empty and made of ASCII letters, digits, `-` and `_`
pub fn validate_slug(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(RobbitError::InvalidAreaName {
            name: name.to_string(),
            reason: "cannot be empty".to_string(),
        });
    }

    if let Some(c) = name.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_')) {
        return Err(RobbitError::InvalidAreaName {
            name: name.to_string(),
            reason: format!("character '{}' is not allowed in a slug", c),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_validation() {
        assert!(validate_slug("paris").is_ok());
        assert!(validate_slug("ile-de_france-2").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("paris france").is_err());
        assert!(validate_slug("café").is_err());
    }

    #[test]
    fn test_new_area() {
        let area = ScanArea::new("world", MultiPolygon::new(vec![])).unwrap();
        assert_eq!(area.name, "world");
        assert!(ScanArea::new("no/slash", MultiPolygon::new(vec![])).is_err());
    }
}
