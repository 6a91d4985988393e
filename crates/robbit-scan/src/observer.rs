use crate::report::{LevelSummary, TileOutcome};

/// Progress hooks called by the scanner.
///
/// `tile_finished` is called from concurrent workers.
pub trait ScanObserver: Send + Sync {
    /// A level pass begins with `total` relevant tiles
    fn level_started(&self, _level: u32, _total: usize) {}

    fn tile_finished(&self, _level: u32, _outcome: TileOutcome) {}

    fn level_finished(&self, _summary: &LevelSummary) {}
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ScanObserver for NoopObserver {}
