use futures::stream::{self, StreamExt};
use robbit_core::config::Settings;
use robbit_core::models::{BoundingBox, SearchPage, SplitOutcome, Tile, TileKey, MAX_DEPTH};
use robbit_flickr::PhotoSearch;
use robbit_store::{AreaStore, ImageStore, TileStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, ScanError};
use crate::observer::{NoopObserver, ScanObserver};
use crate::records::collect_images;
use crate::report::{LevelSummary, ScanReport, TileOutcome};

/// Drives scans of named areas over the tile quadtree
pub struct Scanner {
    search: Arc<dyn PhotoSearch>,
    tiles: Arc<dyn TileStore>,
    images: Arc<dyn ImageStore>,
    areas: Arc<dyn AreaStore>,
    settings: Settings,
    observer: Arc<dyn ScanObserver>,
}

impl Scanner {
    pub fn new(
        search: Arc<dyn PhotoSearch>,
        tiles: Arc<dyn TileStore>,
        images: Arc<dyn ImageStore>,
        areas: Arc<dyn AreaStore>,
        settings: Settings,
    ) -> Self {
        Self { search, tiles, images, areas, settings, observer: Arc::new(NoopObserver) }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ScanObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Tiles processed concurrently within a level
    pub fn workers(&self) -> usize {
        (self.search.key_count() * self.settings.workers_per_key).max(1)
    }

    /// Scan `area_name` until every relevant tile down to the deepest level is
    /// terminal, or until `cancel` fires.
    ///
    /// Tiles already terminal are skipped, so an interrupted scan resumes where it
    /// stopped. Failures of single tiles are counted in the report and leave
    /// those tiles `to-probe`.
    pub async fn scan(&self, area_name: &str, cancel: &CancellationToken) -> Result<ScanReport> {
        self.settings.validate()?;

        if self.areas.get_area(area_name).await?.is_none() {
            return Err(ScanError::UnknownArea(area_name.to_string()));
        }
        self.tiles.ensure_root().await?;

        tracing::info!(area = area_name, workers = self.workers(), "Starting scan");

        let mut report = ScanReport::default();
        for level in 0..=MAX_DEPTH {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let summary = self.scan_level(area_name, level, cancel).await?;
            if summary.candidates > 0 {
                tracing::info!(
                    level,
                    relevant = summary.relevant,
                    split = summary.split,
                    contained = summary.contained,
                    failed = summary.failed,
                    images = summary.images_inserted,
                    "Level done"
                );
                report.levels.push(summary);
            }
        }

        if cancel.is_cancelled() {
            report.cancelled = true;
            tracing::warn!(area = area_name, "Scan cancelled, run it again to resume");
        }

        Ok(report)
    }

    async fn scan_level(&self, area_name: &str, level: u32, cancel: &CancellationToken) -> Result<LevelSummary> {
        let mut summary = LevelSummary::new(level);

        let candidates = self.tiles.tiles_to_probe(level).await?;
        summary.candidates = candidates.len();
        if candidates.is_empty() {
            return Ok(summary);
        }

        let relevant = self.relevant_tiles(area_name, candidates).await?;
        summary.relevant = relevant.len();

        tracing::debug!(level, candidates = summary.candidates, relevant = summary.relevant, "Level started");
        self.observer.level_started(level, relevant.len());

        // No new tile starts once cancelled; tiles already running finish
        let outcomes: Vec<TileOutcome> = stream::iter(relevant)
            .take_until(cancel.cancelled())
            .map(|tile| self.run_tile(level, tile))
            .buffer_unordered(self.workers())
            .collect()
            .await;

        for outcome in outcomes {
            summary.record(outcome);
        }

        self.observer.level_finished(&summary);
        Ok(summary)
    }

    /// Candidates intersecting the area, in candidate order
    async fn relevant_tiles(&self, area_name: &str, candidates: Vec<Tile>) -> Result<Vec<Tile>> {
        let checks: Vec<(Tile, robbit_store::Result<bool>)> = stream::iter(candidates)
            .map(|tile| async move {
                let hit = self.areas.area_intersects(area_name, &tile.bbox()).await;
                (tile, hit)
            })
            .buffered(self.workers())
            .collect()
            .await;

        let mut relevant = Vec::with_capacity(checks.len());
        for (tile, hit) in checks {
            if hit? {
                relevant.push(tile);
            }
        }
        Ok(relevant)
    }

    async fn run_tile(&self, level: u32, tile: Tile) -> TileOutcome {
        let outcome = match self.process_tile(&tile).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(tile = %tile.key, level, error = %e, "Tile failed, it stays to-probe");
                TileOutcome::Failed
            }
        };
        self.observer.tile_finished(level, outcome);
        outcome
    }

    /// Split the tile if it is too dense, harvest it otherwise
    pub async fn process_tile(&self, tile: &Tile) -> Result<TileOutcome> {
        let bbox = tile.bbox();
        let first = self.search.search(&bbox, 1, &self.settings.extras).await?;

        if first.total_results > self.settings.max_search_results() {
            match self.tiles.need_children(tile.key).await? {
                SplitOutcome::Split => {
                    tracing::trace!(tile = %tile.key, total = first.total_results, "Split");
                    return Ok(TileOutcome::Split);
                }
                SplitOutcome::MaxDepth => {
                    tracing::debug!(
                        tile = %tile.key,
                        total = first.total_results,
                        "Tile at max depth is too dense, keeping the first results only"
                    );
                }
            }
        }

        let inserted = self.harvest(tile.key, &bbox, first).await?;
        Ok(TileOutcome::Contained { inserted })
    }

    async fn harvest(&self, key: TileKey, bbox: &BoundingBox, first: SearchPage) -> Result<usize> {
        let last_page = first.total_pages.min(self.settings.max_pages());
        let mut records = first.records;

        for page in 2..=last_page {
            let next = self.search.search(bbox, page, &self.settings.extras).await?;
            records.extend(next.records);
        }

        let limit = usize::try_from(self.settings.max_search_results()).unwrap_or(usize::MAX);
        let harvest = collect_images(records, limit);
        if harvest.malformed > 0 || harvest.truncated > 0 {
            tracing::debug!(
                tile = %key,
                malformed = harvest.malformed,
                truncated = harvest.truncated,
                "Dropped records"
            );
        }

        Ok(self.images.commit_tile(key, harvest.images).await?)
    }
}
