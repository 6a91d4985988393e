//! Raw search results as returned by the remote photo search

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One page of search results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    /// Total number of photos matching the query, across all pages
    pub total_results: u64,
    /// Number of pages the service claims to have
    pub total_pages: u32,
    /// Records on this page
    pub records: Vec<PhotoRecord>,
}

/// An untyped per-photo record.
///
/// Kept as the raw JSON object so the full payload can be stored alongside the
/// parsed fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoRecord(pub Map<String, Value>);

impl PhotoRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// The record's external id, accepting both `"123"` and `123`
    pub fn id(&self) -> Option<i64> {
        self.get("id").and_then(value_as_i64)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for PhotoRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Read an integer that may be encoded as a JSON number or string
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a float that may be encoded as a JSON number or string
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
