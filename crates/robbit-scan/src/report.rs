use std::fmt;

/// What happened to one tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileOutcome {
    /// Delegated to four children
    Split,
    /// Harvested; `inserted` images were new
    Contained { inserted: usize },
    /// Left `to-probe` for a later run
    Failed,
}

/// Counters for one level pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelSummary {
    pub level: u32,
    /// `to-probe` tiles found at this depth
    pub candidates: usize,
    /// Candidates intersecting the scan area
    pub relevant: usize,
    pub split: usize,
    pub contained: usize,
    pub failed: usize,
    pub images_inserted: usize,
}

impl LevelSummary {
    pub fn new(level: u32) -> Self {
        Self { level, ..Self::default() }
    }

    pub fn record(&mut self, outcome: TileOutcome) {
        match outcome {
            TileOutcome::Split => self.split += 1,
            TileOutcome::Contained { inserted } => {
                self.contained += 1;
                self.images_inserted += inserted;
            }
            TileOutcome::Failed => self.failed += 1,
        }
    }

    /// Tiles that reached a terminal state or failed
    pub fn processed(&self) -> usize {
        self.split + self.contained + self.failed
    }
}

impl fmt::Display for LevelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "level {}: {} relevant of {} candidates, {} split, {} contained, {} failed, {} images",
            self.level,
            self.relevant,
            self.candidates,
            self.split,
            self.contained,
            self.failed,
            self.images_inserted
        )
    }
}

/// Outcome of a scan invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// One entry per level that had candidates
    pub levels: Vec<LevelSummary>,
    /// The scan stopped early on request
    pub cancelled: bool,
}

impl ScanReport {
    pub fn images_inserted(&self) -> usize {
        self.levels.iter().map(|l| l.images_inserted).sum()
    }

    pub fn failed(&self) -> usize {
        self.levels.iter().map(|l| l.failed).sum()
    }

    /// Nothing was left behind: no failures and no cancellation
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.failed() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_summary_record() {
        let mut summary = LevelSummary::new(3);
        summary.record(TileOutcome::Split);
        summary.record(TileOutcome::Contained { inserted: 12 });
        summary.record(TileOutcome::Contained { inserted: 0 });
        summary.record(TileOutcome::Failed);

        assert_eq!(summary.split, 1);
        assert_eq!(summary.contained, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.images_inserted, 12);
        assert_eq!(summary.processed(), 4);
    }

    #[test]
    fn test_report_totals() {
        let mut a = LevelSummary::new(0);
        a.record(TileOutcome::Contained { inserted: 5 });
        let mut b = LevelSummary::new(1);
        b.record(TileOutcome::Failed);

        let report = ScanReport { levels: vec![a, b], cancelled: false };
        assert_eq!(report.images_inserted(), 5);
        assert_eq!(report.failed(), 1);
        assert!(!report.is_complete());
    }
}
