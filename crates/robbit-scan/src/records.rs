//! Turning raw search records into images

use robbit_core::models::{Image, PhotoRecord};
use std::collections::HashSet;

/// Images parsed out of a tile's records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Harvest {
    pub images: Vec<Image>,
    /// Records repeated across pages
    pub duplicates: usize,
    /// Records dropped because they could not be parsed
    pub malformed: usize,
    /// Unique records past the retention limit
    pub truncated: usize,
}

/// Deduplicate records by id keeping the first occurrence, retain at most
/// `limit` of them and parse the rest, dropping malformed ones.
pub fn collect_images(records: Vec<PhotoRecord>, limit: usize) -> Harvest {
    let mut harvest = Harvest::default();
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(records.len().min(limit));

    for record in records {
        // Records without a usable id are kept here and rejected by parsing
        if let Some(id) = record.id() {
            if !seen.insert(id) {
                harvest.duplicates += 1;
                continue;
            }
        }
        if unique.len() == limit {
            harvest.truncated += 1;
            continue;
        }
        unique.push(record);
    }

    for record in &unique {
        match Image::try_from(record) {
            Ok(image) => harvest.images.push(image),
            Err(e) => {
                tracing::debug!("Skipping record: {}", e);
                harvest.malformed += 1;
            }
        }
    }

    harvest
}
