//! # Pump Engine
//!
//! Runs one migration: an enumerator task, a relay task, a pool of collector
//! workers, a fan-in supervisor with one merge task per collector, and a
//! pool of drain workers, all connected by bounded channels.
//!
//! ```text
//! enumerator -> [producer queue] -> relay -> [fan-out queue] -+-> collector 0 -> merge 0 -+
//!                                                             +-> collector N -> merge N -+
//!                                                                                         |
//!                  drain 0..N <- [shared block queue] <-----------------------------------+
//! ```
//!
//! Runtime model:
//! - Every task is a Tokio task owned by the run. A fatal error or a panic
//!   in any of them aborts all others.
//! - A queue closes when its last sender is dropped. Each producer owns its
//!   sender, so no queue can be closed early or twice.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::block::{Block, IdentifierRecord};
use crate::config::PumpConfig;
use crate::progress::{NoProgress, Progress, ProgressEvent};
use crate::run_completion::StageTasks;
use crate::stage::{Collector, Drain, Enumerator, Stage};
use crate::stats::{PumpReport, PumpStats};
use crate::{PumpError, Result};

/// Block migration engine.
///
/// The same `Pump` can be used for several runs; each run gets its own
/// queues, workers and counters.
pub struct Pump {
    config: PumpConfig,
    progress: Arc<dyn Progress>,
}

impl Pump {
    /// Create a pump with the given configuration and no progress output.
    pub fn new(config: PumpConfig) -> Self {
        Self {
            config,
            progress: Arc::new(NoProgress),
        }
    }

    /// Set the sink receiving one update per enumerated record.
    pub fn with_progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &PumpConfig {
        &self.config
    }

    /// Migrate every identifier produced by `enumerator`.
    ///
    /// Resolves once every drain worker has finished. Item errors are logged
    /// and counted in the returned report; only configuration errors and
    /// fatal stage errors are returned as `Err`. Nothing is started when the
    /// configuration is invalid.
    pub async fn run(
        &self,
        enumerator: Arc<dyn Enumerator>,
        collector: Arc<dyn Collector>,
        drain: Arc<dyn Drain>,
    ) -> Result<PumpReport> {
        self.config.validate()?;

        let started = Instant::now();
        let workers = self.config.workers;
        let stats = Arc::new(PumpStats::new());

        debug!(
            workers,
            queue_capacity = self.config.queue_capacity,
            channel_size = self.config.channel_size,
            "Starting pump"
        );

        let (record_tx, record_rx) = flume::bounded(self.config.queue_capacity);
        let (fanout_tx, fanout_rx) = flume::bounded(self.config.channel_size);
        let (block_tx, block_rx) = flume::bounded(self.config.channel_size);

        let mut tasks = StageTasks::new();

        // Single task for the enumerator
        tasks.spawn(Stage::Enumerate, enumerate(enumerator.clone(), record_tx));

        tasks.spawn(
            Stage::Relay,
            relay(
                enumerator,
                record_rx,
                fanout_tx,
                self.progress.clone(),
                stats.clone(),
            ),
        );

        // Each collector worker gets its own output stream so the fan-in can
        // tell when all of them are done.
        let mut streams = Vec::with_capacity(workers);
        for worker in 0..workers {
            let (out_tx, out_rx) = flume::bounded(self.config.channel_size);
            tasks.spawn(
                Stage::Collect,
                collect(worker, collector.clone(), fanout_rx.clone(), out_tx),
            );
            streams.push(out_rx);
        }
        drop(fanout_rx);

        tasks.spawn(Stage::Merge, fan_in(streams, block_tx));

        for worker in 0..workers {
            tasks.spawn(
                Stage::Drain,
                drain_blocks(worker, drain.clone(), block_rx.clone(), stats.clone()),
            );
        }
        drop(block_rx);

        debug!(tasks = tasks.len(), "Pump tasks spawned");
        tasks.settle().await?;

        let report = stats.report(started.elapsed());
        self.progress.finish(&report);
        info!(
            processed = report.processed,
            written = report.written,
            failed = report.failures(),
            "Pump finished: {}",
            report
        );
        Ok(report)
    }
}

async fn enumerate(
    enumerator: Arc<dyn Enumerator>,
    out: flume::Sender<IdentifierRecord>,
) -> Result<()> {
    enumerator
        .produce(out)
        .await
        .map_err(|e| PumpError::stage(Stage::Enumerate, e))?;
    debug!("Enumeration finished");
    Ok(())
}

/// Report progress for every record and forward the resolvable ones.
///
/// The fan-out queue closes when this task returns, which is exactly when
/// the producer queue has been closed and drained.
async fn relay(
    enumerator: Arc<dyn Enumerator>,
    records: flume::Receiver<IdentifierRecord>,
    fanout: flume::Sender<IdentifierRecord>,
    progress: Arc<dyn Progress>,
    stats: Arc<PumpStats>,
) -> Result<()> {
    while let Ok(record) = records.recv_async().await {
        let processed = stats.record_processed();
        let total = match enumerator.total_count() {
            0 => None,
            total => Some(total),
        };
        progress.on_item(&ProgressEvent {
            processed,
            total,
            identifier: &record.id,
        });

        if let Some(error) = &record.error {
            warn!(identifier = %record.id, error = %error, "Error enumerating block");
            stats.record_enumeration_failure();
            continue;
        }

        if fanout.send_async(record).await.is_err() {
            return Err(PumpError::ChannelClosed("collector workers"));
        }
    }

    debug!(processed = stats.processed(), "Relay finished");
    Ok(())
}

async fn collect(
    worker: usize,
    collector: Arc<dyn Collector>,
    input: flume::Receiver<IdentifierRecord>,
    out: flume::Sender<Block>,
) -> Result<()> {
    debug!(worker, "Collector worker started");
    collector
        .collect(input, out)
        .await
        .map_err(|e| PumpError::stage(Stage::Collect, e))?;
    debug!(worker, "Collector worker finished");
    Ok(())
}

/// Merge the collectors' private streams into the shared block queue.
///
/// The shared queue closes when this task drops `shared`, after every merge
/// task has seen the end of its stream.
async fn fan_in(streams: Vec<flume::Receiver<Block>>, shared: flume::Sender<Block>) -> Result<()> {
    let mut merges = StageTasks::new();
    for (worker, stream) in streams.into_iter().enumerate() {
        merges.spawn(Stage::Merge, merge(worker, stream, shared.clone()));
    }

    merges.settle().await?;
    drop(shared);
    debug!("All collector streams merged");
    Ok(())
}

async fn merge(
    worker: usize,
    stream: flume::Receiver<Block>,
    shared: flume::Sender<Block>,
) -> Result<()> {
    let mut merged: u64 = 0;
    while let Ok(block) = stream.recv_async().await {
        if shared.send_async(block).await.is_err() {
            return Err(PumpError::ChannelClosed("drain workers"));
        }
        merged += 1;
    }
    debug!(worker, merged, "Collector stream ended");
    Ok(())
}

async fn drain_blocks(
    worker: usize,
    drain: Arc<dyn Drain>,
    blocks: flume::Receiver<Block>,
    stats: Arc<PumpStats>,
) -> Result<()> {
    debug!(worker, "Drain worker started");
    while let Ok(block) = blocks.recv_async().await {
        if let Some(error) = &block.error {
            warn!(identifier = %block.id, error = %error, "Error retrieving block");
            stats.record_retrieval_failure();
            continue;
        }

        match drain.write(&block).await {
            Ok(()) => stats.record_written(),
            Err(error) => {
                warn!(identifier = %block.id, error = %error, "Failed to push block");
                stats.record_write_failure();
            }
        }
    }
    debug!(worker, "Drain worker finished");
    Ok(())
}
