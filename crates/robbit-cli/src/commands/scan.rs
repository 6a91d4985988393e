use crate::cli::{ScanArgs, StorageBackend};
use crate::output::OutputWriter;
use crate::progress::LevelProgress;
use crate::storage::Storage;
use anyhow::{Context, Result};
use robbit_core::config::Settings;
use robbit_flickr::{FlickrClient, PhotoSearch};
use robbit_scan::{ScanReport, Scanner};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Serialize)]
struct ScanOutput<'a> {
    area: &'a str,
    cancelled: bool,
    images_inserted: usize,
    failed_tiles: usize,
    levels: Vec<LevelOutput>,
}

#[derive(Serialize)]
struct LevelOutput {
    level: u32,
    candidates: usize,
    relevant: usize,
    split: usize,
    contained: usize,
    failed: usize,
    images_inserted: usize,
}

pub async fn execute(args: ScanArgs, backend: StorageBackend, settings: &Settings, output: &OutputWriter) -> Result<()> {
    // No keys means no scan: fail before touching storage
    let keys = settings.require_api_keys().context("Cannot scan without API keys")?;
    let workers = keys.len() * settings.workers_per_key;

    let storage = Storage::new(backend, settings.database_url.as_deref(), workers).await?;

    if let Some(path) = &args.area_file {
        super::area::register(&storage, &args.area, path).await?;
        output.info(format!("Registered area \"{}\" from {}", args.area, path.display()));
    }

    let client = Arc::new(FlickrClient::from_settings(settings).context("Failed to create Flickr client")?);
    client.start().await?;

    let cancel = CancellationToken::new();
    let ctrl_c = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, finishing tiles in progress");
                cancel.cancel();
            }
        }
    });

    let progress = (!args.no_progress && !output.is_json()).then(|| Arc::new(LevelProgress::new()));

    let mut scanner = Scanner::new(
        client.clone() as Arc<dyn PhotoSearch>,
        storage.tiles.clone(),
        storage.images.clone(),
        storage.areas.clone(),
        settings.clone(),
    );
    if let Some(progress) = &progress {
        scanner = scanner.with_observer(progress.clone());
    }

    output.info(format!("Scanning \"{}\" with {} key(s), {} worker(s)", args.area, keys.len(), scanner.workers()));
    let result = scanner.scan(&args.area, &cancel).await;

    if let Some(progress) = &progress {
        progress.finish();
    }
    client.stop().await;
    ctrl_c.abort();

    let report = result.with_context(|| format!("Scan of \"{}\" failed", args.area))?;
    print_report(&args.area, &report, output)
}

fn print_report(area: &str, report: &ScanReport, output: &OutputWriter) -> Result<()> {
    if output.is_json() {
        return output.result(ScanOutput {
            area,
            cancelled: report.cancelled,
            images_inserted: report.images_inserted(),
            failed_tiles: report.failed(),
            levels: report
                .levels
                .iter()
                .map(|l| LevelOutput {
                    level: l.level,
                    candidates: l.candidates,
                    relevant: l.relevant,
                    split: l.split,
                    contained: l.contained,
                    failed: l.failed,
                    images_inserted: l.images_inserted,
                })
                .collect(),
        });
    }

    if report.cancelled {
        output.warning(format!(
            "Scan interrupted after inserting {} images; run it again to resume",
            report.images_inserted()
        ));
    } else if report.failed() > 0 {
        output.warning(format!(
            "{} tile(s) failed and stay to-probe; run the scan again to retry them",
            report.failed()
        ));
    } else {
        output.success(format!("Scan of \"{}\" complete: {} new images", area, report.images_inserted()));
    }
    Ok(())
}
