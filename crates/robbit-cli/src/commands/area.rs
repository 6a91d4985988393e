use crate::cli::{AreaArgs, AreaCommand, StorageBackend};
use crate::output::OutputWriter;
use crate::storage::Storage;
use anyhow::{Context, Result};
use robbit_core::config::Settings;
use robbit_core::models::ScanArea;
use robbit_geo::multipolygon_from_geojson;
use std::path::Path;

pub async fn execute(args: AreaArgs, backend: StorageBackend, settings: &Settings, output: &OutputWriter) -> Result<()> {
    let storage = Storage::new(backend, settings.database_url.as_deref(), 1).await?;

    match args.command {
        AreaCommand::Add(add) => {
            let area = register(&storage, &add.name, &add.path).await?;
            if output.is_json() {
                return output.result(serde_json::json!({
                    "name": area.name,
                    "polygons": area.geometry.0.len(),
                }));
            }
            output.success(format!("Saved area \"{}\" ({} polygon(s))", area.name, area.geometry.0.len()));
        }
        AreaCommand::List => {
            let names = storage.areas.list_areas().await.context("Failed to list areas")?;
            if output.is_json() {
                return output.result(names);
            }
            if names.is_empty() {
                output.info("No areas yet, add one with `robbit area add <name> <file.geojson>`");
            }
            for name in names {
                println!("{}", name);
            }
        }
    }
    Ok(())
}

/// Read a GeoJSON file and store it as a named area
pub async fn register(storage: &Storage, name: &str, path: &Path) -> Result<ScanArea> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let geometry = multipolygon_from_geojson(&content).with_context(|| format!("Invalid area in {}", path.display()))?;
    let area = ScanArea::new(name, geometry)?;

    storage.areas.put_area(&area).await.context("Failed to save area")?;
    Ok(area)
}
