//! Run counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters shared by the relay and drain workers of one run.
#[derive(Debug, Default)]
pub struct PumpStats {
    processed: AtomicU64,
    enumeration_failures: AtomicU64,
    retrieval_failures: AtomicU64,
    write_failures: AtomicU64,
    written: AtomicU64,
}

impl PumpStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one record taken off the producer queue. Returns the new total.
    pub fn record_processed(&self) -> u64 {
        self.processed.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_enumeration_failure(&self) {
        self.enumeration_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retrieval_failure(&self) {
        self.retrieval_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_written(&self) {
        self.written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Take a snapshot of the counters.
    pub fn report(&self, elapsed: Duration) -> PumpReport {
        PumpReport {
            processed: self.processed.load(Ordering::Relaxed),
            enumeration_failures: self.enumeration_failures.load(Ordering::Relaxed),
            retrieval_failures: self.retrieval_failures.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            elapsed,
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PumpReport {
    /// Records taken off the producer queue, skipped or not.
    pub processed: u64,
    /// Records dropped by the relay because enumeration failed.
    pub enumeration_failures: u64,
    /// Blocks skipped by the drains because retrieval failed.
    pub retrieval_failures: u64,
    /// Blocks the drain failed to write.
    pub write_failures: u64,
    /// Blocks successfully written.
    pub written: u64,
    pub elapsed: Duration,
}

impl PumpReport {
    /// Number of item errors of any stage.
    pub fn failures(&self) -> u64 {
        self.enumeration_failures + self.retrieval_failures + self.write_failures
    }
}

impl std::fmt::Display for PumpReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} processed, {} written, {} failed (enumerate: {}, collect: {}, drain: {}) in {:.2?}",
            self.processed,
            self.written,
            self.failures(),
            self.enumeration_failures,
            self.retrieval_failures,
            self.write_failures,
            self.elapsed
        )
    }
}
