//! Harvested photo records

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::geometry::Coordinate;
use super::search::{value_as_f64, value_as_i64, PhotoRecord};
use crate::error::{Result, RobbitError};

/// Timestamp layouts the search API uses for `datetaken`
const DATE_TAKEN_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// A harvested photo. All data returned by the API is kept in `data` in case it
/// becomes useful later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    /// Unique id assigned by the remote service
    pub external_id: i64,
    pub coords: Coordinate,
    /// Capture time, interpreted as UTC
    pub date_taken: Option<DateTime<Utc>>,
    /// Favorite count, 0 when the field was not requested
    pub popularity: u32,
    pub data: Value,
}

impl TryFrom<&PhotoRecord> for Image {
    type Error = RobbitError;

    fn try_from(record: &PhotoRecord) -> Result<Self> {
        let raw_id = record.get("id").map(|v| v.to_string()).unwrap_or_else(|| "<none>".into());
        let malformed = |reason: &str| RobbitError::MalformedRecord {
            id: raw_id.clone(),
            reason: reason.to_string(),
        };

        let external_id = record.id().ok_or_else(|| malformed("missing or non-integer id"))?;

        let lon = record
            .get("longitude")
            .and_then(value_as_f64)
            .ok_or_else(|| malformed("missing or non-numeric longitude"))?;
        let lat = record
            .get("latitude")
            .and_then(value_as_f64)
            .ok_or_else(|| malformed("missing or non-numeric latitude"))?;
        let coords = Coordinate::new(lon, lat);
        if !coords.is_valid() {
            return Err(malformed("coordinates out of range"));
        }

        let date_taken = match record.get("datetaken") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => {
                Some(parse_date_taken(s).ok_or_else(|| malformed("unparseable datetaken"))?)
            }
            Some(_) => return Err(malformed("datetaken is not a string")),
        };

        let popularity = match record.get("count_faves") {
            None | Some(Value::Null) => 0,
            Some(v) => value_as_i64(v)
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| malformed("count_faves is not a non-negative integer"))?,
        };

        Ok(Image {
            external_id,
            coords,
            date_taken,
            popularity,
            data: Value::Object(record.0.clone()),
        })
    }
}

/// Parse a capture timestamp as UTC
pub fn parse_date_taken(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    DATE_TAKEN_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn record(value: Value) -> PhotoRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_complete_record() {
        let r = record(json!({
            "id": "9001",
            "longitude": "2.3522",
            "latitude": 48.8566,
            "datetaken": "2019-07-17 10:48:00",
            "count_faves": "12",
            "url_q": "https://example.org/q.jpg"
        }));

        let image = Image::try_from(&r).unwrap();
        assert_eq!(image.external_id, 9001);
        assert_eq!(image.coords, Coordinate::new(2.3522, 48.8566));
        assert_eq!(image.date_taken, Some(Utc.with_ymd_and_hms(2019, 7, 17, 10, 48, 0).unwrap()));
        assert_eq!(image.popularity, 12);
        assert_eq!(image.data["url_q"], "https://example.org/q.jpg");
    }

    #[test]
    fn test_optional_fields_default() {
        let r = record(json!({"id": 1, "longitude": 0, "latitude": 0}));
        let image = Image::try_from(&r).unwrap();
        assert_eq!(image.date_taken, None);
        assert_eq!(image.popularity, 0);
    }

    #[test]
    fn test_malformed_records_rejected() {
        let bad = [
            json!({"id": "x", "longitude": "1", "latitude": "1"}),
            json!({"id": "1", "longitude": "east", "latitude": "1"}),
            json!({"id": "1", "latitude": "1"}),
            json!({"id": "1", "longitude": "1", "latitude": "95"}),
            json!({"id": "1", "longitude": "1", "latitude": "1", "datetaken": "yesterday"}),
            json!({"id": "1", "longitude": "1", "latitude": "1", "count_faves": "-3"}),
        ];

        for value in bad {
            let err = Image::try_from(&record(value.clone())).unwrap_err();
            assert!(matches!(err, RobbitError::MalformedRecord { .. }), "{value}");
        }
    }

    #[test]
    fn test_parse_date_taken_formats() {
        let expected = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(parse_date_taken("2020-01-02 03:04:05"), Some(expected));
        assert_eq!(parse_date_taken("2020-01-02T03:04:05"), Some(expected));
        assert_eq!(parse_date_taken("2020-01-02T04:04:05+01:00"), Some(expected));
        assert_eq!(parse_date_taken("1577934245"), None);
    }
}
