//! Batch-wide progress reporting.
//!
//! Every stage of a batch advances the same [`ProgressTracker`], so the
//! percentage handed to the caller is computed against the whole batch rather
//! than per stage. Callers plug in any [`ProgressReporter`]: a log sink, a
//! channel to a UI thread, a terminal progress bar, or a closure in tests.

use log::info;

/// Receives progress updates from the pipeline.
pub trait ProgressReporter {
    /// Called at each per-file step boundary with a 0-100 percentage and a
    /// human-readable status line.
    fn report(&self, percent: u8, message: &str);
}

impl<F> ProgressReporter for F
where
    F: Fn(u8, &str),
{
    fn report(&self, percent: u8, message: &str) {
        self(percent, message)
    }
}

/// Reporter that forwards every update to the `log` facade at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn report(&self, percent: u8, message: &str) {
        info!("[{:>3}%] {}", percent, message);
    }
}

/// Reporter that discards all updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn report(&self, _percent: u8, _message: &str) {}
}

/// Running `(processed, total)` counter shared by all stages of one batch.
///
/// The emitted percentage never decreases, even when the total is revised
/// upward after the archive has been unpacked.
pub struct ProgressTracker<'a> {
    processed: usize,
    total: usize,
    last_percent: u8,
    reporter: &'a dyn ProgressReporter,
}

impl<'a> ProgressTracker<'a> {
    /// Create a tracker for a batch of `total` steps.
    pub fn new(total: usize, reporter: &'a dyn ProgressReporter) -> Self {
        Self {
            processed: 0,
            total,
            last_percent: 0,
            reporter,
        }
    }

    /// Revise the number of steps in the batch.
    pub fn set_total(&mut self, total: usize) {
        self.total = total.max(self.processed);
    }

    /// Number of steps completed so far.
    pub fn processed(&self) -> usize {
        self.processed
    }

    /// Total number of steps in the batch.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Current percentage, clamped to 0-100 and monotonic.
    pub fn percent(&self) -> u8 {
        self.last_percent
    }

    /// Complete one step and report it.
    pub fn step(&mut self, message: impl AsRef<str>) {
        self.processed += 1;
        self.update_percent();
        self.reporter.report(self.last_percent, message.as_ref());
    }

    /// Report a status line without advancing the counter.
    pub fn message(&self, message: impl AsRef<str>) {
        self.reporter.report(self.last_percent, message.as_ref());
    }

    /// Mark the batch complete and report 100%.
    pub fn finish(&mut self, message: impl AsRef<str>) {
        self.processed = self.total.max(self.processed);
        self.last_percent = 100;
        self.reporter.report(100, message.as_ref());
    }

    fn update_percent(&mut self) {
        if self.total == 0 {
            return;
        }
        let percent = (self.processed.min(self.total) * 100 / self.total) as u8;
        self.last_percent = self.last_percent.max(percent);
    }
}
