use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use pump_backends::{BackendOptions, CollectorKind, DrainKind, EnumeratorKind};
use pump_engine::PumpConfig;
use pump_engine::config::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_QUEUE_CAPACITY};

/// How progress is shown while the pump runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProgressMode {
    /// Progress bar on stderr
    Bar,
    /// One log line per block
    Log,
    /// No progress output
    #[value(name = "none")]
    Off,
}

#[derive(Parser, Debug)]
#[command(
    name = "pump",
    author,
    version,
    about = "Migrate content-addressed blocks from one store to another",
    long_about = None
)]
pub struct Args {
    /// Source of the identifiers to migrate
    #[arg(value_enum, env = "PUMP_ENUMERATOR")]
    pub enumerator: EnumeratorKind,

    /// Store the blocks are read from
    #[arg(value_enum, env = "PUMP_COLLECTOR")]
    pub collector: CollectorKind,

    /// Store the blocks are written to
    #[arg(value_enum, env = "PUMP_DRAIN")]
    pub drain: DrainKind,

    /// Number of collector workers, and of drain workers
    #[arg(long = "worker", default_value_t = 1, env = "PUMP_WORKER")]
    pub workers: usize,

    /// Identifiers buffered ahead of the collectors
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY, env = "PUMP_QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    /// Capacity of the queues between workers
    #[arg(long, default_value_t = DEFAULT_CHANNEL_CAPACITY, env = "PUMP_CHANNEL_SIZE")]
    pub channel_size: usize,

    /// File with one identifier per line
    #[arg(long, env = "PUMP_ENUM_FILE_PATH", help_heading = "Enumerator options")]
    pub enum_file_path: Option<PathBuf>,

    /// API node whose recursive pins are migrated
    #[arg(long, env = "PUMP_ENUM_API_PIN_URL", help_heading = "Enumerator options")]
    pub enum_api_pin_url: Option<String>,

    /// Stream the pin listing instead of fetching it at once
    #[arg(long, env = "PUMP_ENUM_API_PIN_STREAM", help_heading = "Enumerator options")]
    pub enum_api_pin_stream: bool,

    /// Flat-file store to enumerate
    #[arg(long, env = "PUMP_ENUM_FLATFS_PATH", help_heading = "Enumerator options")]
    pub enum_flatfs_path: Option<PathBuf>,

    /// API node to read blocks from
    #[arg(long, env = "PUMP_COLL_API_URL", help_heading = "Collector options")]
    pub coll_api_url: Option<String>,

    /// Flat-file store to read blocks from
    #[arg(long, env = "PUMP_COLL_FLATFS_PATH", help_heading = "Collector options")]
    pub coll_flatfs_path: Option<PathBuf>,

    /// API node to write blocks to
    #[arg(long, env = "PUMP_DRAIN_API_URL", help_heading = "Drain options")]
    pub drain_api_url: Option<String>,

    /// Flat-file store to write blocks to (created if missing)
    #[arg(long, env = "PUMP_DRAIN_FLATFS_PATH", help_heading = "Drain options")]
    pub drain_flatfs_path: Option<PathBuf>,

    /// Progress output
    #[arg(long, value_enum, default_value_t = ProgressMode::Bar, env = "PUMP_PROGRESS")]
    pub progress: ProgressMode,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Also write logs to this file
    #[arg(long, env = "PUMP_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    pub fn pump_config(&self) -> PumpConfig {
        PumpConfig::default()
            .with_workers(self.workers)
            .with_queue_capacity(self.queue_capacity)
            .with_channel_size(self.channel_size)
    }

    pub fn backend_options(&self) -> BackendOptions {
        BackendOptions {
            enum_file_path: self.enum_file_path.clone(),
            enum_api_pin_url: self.enum_api_pin_url.clone(),
            enum_api_pin_stream: self.enum_api_pin_stream,
            enum_flatfs_path: self.enum_flatfs_path.clone(),
            coll_api_url: self.coll_api_url.clone(),
            coll_flatfs_path: self.coll_flatfs_path.clone(),
            drain_api_url: self.drain_api_url.clone(),
            drain_flatfs_path: self.drain_flatfs_path.clone(),
        }
    }
}
