use crate::cli::StorageBackend;
use crate::output::OutputWriter;
use crate::storage::Storage;
use anyhow::{Context, Result};
use robbit_core::config::Settings;

pub async fn execute(backend: StorageBackend, settings: &Settings, output: &OutputWriter) -> Result<()> {
    let storage = Storage::new(backend, settings.database_url.as_deref(), 1).await?;

    let report = storage.tiles.reset().await.context("Failed to reset tiles")?;

    if output.is_json() {
        return output.result(serde_json::json!({
            "deleted": report.deleted,
            "reset": report.reset,
        }));
    }
    output.success(format!("Deleted {} tiles", report.deleted));
    Ok(())
}
