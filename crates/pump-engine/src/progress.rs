//! Progress reporting.
//!
//! The relay task reports every record it takes off the producer queue,
//! whether the record is later skipped or written, so the processed count
//! only ever grows.

use tracing::info;

use crate::block::Identifier;
use crate::stats::PumpReport;

/// A single progress update.
#[derive(Debug, Clone, Copy)]
pub struct ProgressEvent<'a> {
    /// Records processed so far, including this one.
    pub processed: u64,
    /// Total announced by the enumerator, `None` while unknown.
    pub total: Option<u64>,
    /// Identifier of the record being processed.
    pub identifier: &'a Identifier,
}

impl ProgressEvent<'_> {
    /// Completion percentage, `None` while the total is unknown.
    pub fn percent(&self) -> Option<f64> {
        self.total
            .map(|total| (self.processed as f64 / total as f64 * 100.0).min(100.0))
    }
}

impl std::fmt::Display for ProgressEvent<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.total, self.percent()) {
            (Some(total), Some(percent)) => write!(
                f,
                "[{}/{} - {:.2}%] {}",
                self.processed, total, percent, self.identifier
            ),
            _ => write!(f, "[{}/?] {}", self.processed, self.identifier),
        }
    }
}

/// Sink for progress updates.
///
/// Called from the relay task only, one call at a time.
pub trait Progress: Send + Sync {
    fn on_item(&self, event: &ProgressEvent<'_>);

    /// Called once when the run completes.
    fn finish(&self, _report: &PumpReport) {}
}

/// Writes one log line per processed record.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl Progress for LogProgress {
    fn on_item(&self, event: &ProgressEvent<'_>) {
        info!("{}", event);
    }
}

/// Discards progress updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn on_item(&self, _event: &ProgressEvent<'_>) {}
}
