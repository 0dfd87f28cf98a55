//! Engine configuration.

use crate::{PumpError, Result};

/// Default capacity of the producer queue.
///
/// Enumerating is usually far cheaper than retrieving or writing, so the
/// enumerator is allowed to run well ahead before it is suspended.
pub const DEFAULT_QUEUE_CAPACITY: usize = 500_000;

/// Default capacity for the queues between the relay, collectors and drains.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// Immutable configuration of a pump run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpConfig {
    /// Number of collector workers, and of drain workers.
    pub workers: usize,
    /// Capacity of the producer queue fed by the enumerator.
    pub queue_capacity: usize,
    /// Capacity of the fan-out, per-worker and shared block queues.
    pub channel_size: usize,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            channel_size: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl PumpConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_channel_size(mut self, size: usize) -> Self {
        self.channel_size = size;
        self
    }

    /// Check the configuration before any stage is started.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(PumpError::config("minimal number of workers is 1"));
        }
        if self.queue_capacity == 0 {
            return Err(PumpError::config("queue capacity must be at least 1"));
        }
        if self.channel_size == 0 {
            return Err(PumpError::config("channel size must be at least 1"));
        }
        Ok(())
    }
}
