use crate::cli::StorageBackend;
use crate::output::OutputWriter;
use crate::storage::Storage;
use anyhow::{Context, Result};
use robbit_core::config::Settings;
use robbit_core::models::TileStatus;
use robbit_store::StatusCount;
use serde::Serialize;
use std::collections::BTreeMap;
use tabled::Tabled;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Tabled)]
struct LevelRow {
    #[tabled(rename = "Level")]
    level: u32,
    #[tabled(rename = "To probe")]
    to_probe: u64,
    #[tabled(rename = "Contained")]
    contained: u64,
    #[tabled(rename = "Split")]
    split: u64,
}

fn level_rows(counts: &[StatusCount]) -> Vec<LevelRow> {
    let mut rows: BTreeMap<u32, LevelRow> = BTreeMap::new();
    for count in counts {
        let row = rows.entry(count.depth).or_insert_with(|| LevelRow { level: count.depth, ..LevelRow::default() });
        match count.status {
            TileStatus::ToProbe => row.to_probe += count.count,
            TileStatus::Contained => row.contained += count.count,
            TileStatus::Split => row.split += count.count,
        }
    }
    rows.into_values().collect()
}

pub async fn execute(backend: StorageBackend, settings: &Settings, output: &OutputWriter) -> Result<()> {
    let storage = Storage::new(backend, settings.database_url.as_deref(), 1).await?;

    let counts = storage.tiles.status_counts().await.context("Failed to count tiles")?;
    let images = storage.images.count_images().await.context("Failed to count images")?;
    let areas = storage.areas.list_areas().await.context("Failed to list areas")?;
    let rows = level_rows(&counts);

    if output.is_json() {
        return output.result(serde_json::json!({
            "levels": rows,
            "images": images,
            "areas": areas,
        }));
    }

    output.section("Tiles");
    output.table(rows);
    output.section("Summary");
    output.info(format!("{} images harvested", images));
    output.info(format!("{} area(s): {}", areas.len(), areas.join(", ")));
    Ok(())
}
