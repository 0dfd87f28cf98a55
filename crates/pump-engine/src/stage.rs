//! Stage capabilities plugged into the pump.
//!
//! Each capability is shared as an `Arc<dyn _>` between every worker of its
//! stage, so implementations must be safe to call concurrently.

use async_trait::async_trait;

use crate::BoxError;
use crate::block::{Block, IdentifierRecord};

/// Pipeline stage, used to label workers, logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Identifier enumeration.
    Enumerate,
    /// Forwarding of enumerated records to the collectors.
    Relay,
    /// Block retrieval.
    Collect,
    /// Merging of the collectors' private streams.
    Merge,
    /// Block persistence.
    Drain,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Enumerate => write!(f, "enumerate"),
            Stage::Relay => write!(f, "relay"),
            Stage::Collect => write!(f, "collect"),
            Stage::Merge => write!(f, "merge"),
            Stage::Drain => write!(f, "drain"),
        }
    }
}

/// Source of the identifiers to migrate.
#[async_trait]
pub trait Enumerator: Send + Sync {
    /// Send every identifier to migrate into `out`.
    ///
    /// The stream ends when `out` is dropped, which happens when this method
    /// returns. An `Err` is fatal and aborts the whole run; failures that
    /// concern a single identifier belong in [`IdentifierRecord::error`].
    async fn produce(&self, out: flume::Sender<IdentifierRecord>) -> Result<(), BoxError>;

    /// Number of identifiers this enumerator will produce, `0` when unknown.
    ///
    /// Polled once per produced record, so it may grow while enumeration
    /// is in progress.
    fn total_count(&self) -> u64;
}

/// Retrieves the blocks named by identifier records.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Read records from `input` until it terminates and send one [`Block`]
    /// per record into `out`.
    ///
    /// Called once per collector worker. `input` is shared with the other
    /// workers, `out` is private to this one. Implementations must keep
    /// reading until `input` terminates; `out` is dropped when this method
    /// returns. An `Err` is fatal. A failure to retrieve one block belongs in
    /// [`Block::error`].
    async fn collect(
        &self,
        input: flume::Receiver<IdentifierRecord>,
        out: flume::Sender<Block>,
    ) -> Result<(), BoxError>;
}

/// Persists blocks at the destination.
#[async_trait]
pub trait Drain: Send + Sync {
    /// Write one block. An `Err` concerns this block only and never stops
    /// the run.
    async fn write(&self, block: &Block) -> Result<(), BoxError>;
}
