//! # Pump Engine
//!
//! This crate provides the concurrent pipeline that migrates content-addressed
//! blocks from one store to another. It knows nothing about concrete stores:
//! the three stages are pluggable capabilities.
//!
//! ## Stages
//!
//! - [`Enumerator`] produces the identifiers to migrate
//! - [`Collector`] turns identifiers into retrieved [`Block`]s
//! - [`Drain`] persists blocks at the destination
//!
//! [`Pump`] wires them together with bounded queues, a pool of collector and
//! drain workers, per-item failure isolation and progress reporting.
//!
//! ## License
//!
//! MIT License
//!

use thiserror::Error;

mod block;
pub mod config;
mod engine;
pub mod progress;
mod run_completion;
mod stage;
mod stats;
#[cfg(test)]
mod test_utils;

/// Re-export key traits and types
pub use block::{Block, Identifier, IdentifierRecord, InvalidIdentifier};
pub use config::PumpConfig;
pub use engine::Pump;
pub use progress::{LogProgress, NoProgress, Progress, ProgressEvent};
pub use stage::{Collector, Drain, Enumerator, Stage};
pub use stats::{PumpReport, PumpStats};

/// Boxed error carried by stage capabilities and item records.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, PumpError>;

/// Fatal error of a pump run.
///
/// Item errors never show up here: they are logged and counted in the
/// [`PumpReport`] instead.
#[derive(Error, Debug)]
pub enum PumpError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Stage failed ({stage}): {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: BoxError,
    },

    #[error("Channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("Stage task failed ({stage}): {message}")]
    TaskFailed { stage: Stage, message: String },
}

impl PumpError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn stage(stage: Stage, source: impl Into<BoxError>) -> Self {
        Self::Stage {
            stage,
            source: source.into(),
        }
    }
}
