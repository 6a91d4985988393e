//! Decoding of `flickr.photos.search` JSON bodies

use robbit_core::models::search::value_as_i64;
use robbit_core::models::{PhotoRecord, SearchPage};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{FlickrError, Result};

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    stat: Option<String>,
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    photos: Option<Photos>,
}

// `total` and `pages` come back as strings or numbers depending on the endpoint version
#[derive(Debug, Deserialize)]
struct Photos {
    #[serde(default)]
    total: Value,
    #[serde(default)]
    pages: Value,
    #[serde(default)]
    photo: Vec<PhotoRecord>,
}

fn count(field: &str, value: &Value) -> Result<u64> {
    value_as_i64(value)
        .and_then(|n| u64::try_from(n).ok())
        .ok_or_else(|| FlickrError::Decode(format!("invalid '{}': {}", field, value)))
}

/// Decode a search response body, surfacing in-band API failures
pub fn decode_search_page(body: &str) -> Result<SearchPage> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| FlickrError::Decode(e.to_string()))?;

    if envelope.stat.as_deref() == Some("fail") {
        return Err(FlickrError::Api {
            code: envelope.code.as_ref().and_then(value_as_i64).unwrap_or_default(),
            message: envelope.message.unwrap_or_default(),
        });
    }

    let photos = envelope
        .photos
        .ok_or_else(|| FlickrError::Decode("missing 'photos' object".to_string()))?;
    let total_pages = u32::try_from(count("pages", &photos.pages)?)
        .map_err(|_| FlickrError::Decode(format!("'pages' out of range: {}", photos.pages)))?;

    Ok(SearchPage {
        total_results: count("total", &photos.total)?,
        total_pages,
        records: photos.photo,
    })
}
