use crate::cli::{DbArgs, DbCommand};
use crate::output::OutputWriter;
use crate::storage::connect_postgres;
use anyhow::{Context, Result};
use robbit_core::config::Settings;

/// Execute database management commands
pub async fn execute(args: DbArgs, settings: &Settings, output: &OutputWriter) -> Result<()> {
    let store = connect_postgres(settings.database_url.as_deref(), 1, false).await?;

    match args.command {
        DbCommand::Migrate => {
            let pending = store
                .migration_status()
                .await
                .context("Failed to check migration status")?
                .into_iter()
                .filter(|m| !m.applied)
                .count();
            store.run_migrations().await.context("Failed to run migrations")?;
            output.success(format!("Applied {} migration(s)", pending));
        }
        DbCommand::Status => {
            let statuses = store.migration_status().await.context("Failed to check migration status")?;
            if output.is_json() {
                let rows: Vec<_> = statuses
                    .iter()
                    .map(|m| serde_json::json!({
                        "version": m.version,
                        "description": m.description,
                        "applied": m.applied,
                    }))
                    .collect();
                return output.result(rows);
            }
            for m in statuses {
                let mark = if m.applied { "applied" } else { "pending" };
                output.info(format!("{} {} ({})", m.version, m.description, mark));
            }
        }
    }
    Ok(())
}
