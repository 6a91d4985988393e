use indicatif::{ProgressBar, ProgressStyle};
use robbit_scan::{LevelSummary, ScanObserver, TileOutcome};

/// Create a progress bar for determinate progress
pub fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} tiles ({percent}%) ETA: {eta}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░ ");
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}

/// One progress bar per level pass
pub struct LevelProgress {
    bar: ProgressBar,
}

impl LevelProgress {
    pub fn new() -> Self {
        let bar = create_progress_bar(0, "Preparing");
        bar.set_draw_target(indicatif::ProgressDrawTarget::hidden());
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ScanObserver for LevelProgress {
    fn level_started(&self, level: u32, total: usize) {
        if total == 0 {
            return;
        }
        self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        self.bar.reset();
        self.bar.set_length(total as u64);
        self.bar.set_message(format!("Level {:>2}", level));
    }

    fn tile_finished(&self, _level: u32, _outcome: TileOutcome) {
        self.bar.inc(1);
    }

    fn level_finished(&self, summary: &LevelSummary) {
        if summary.relevant == 0 {
            return;
        }
        self.bar.println(format!("✓ {}", summary));
    }
}
