mod cli;
mod error;
mod logging;
mod progress;

use std::process;
use std::sync::Arc;

use clap::Parser;
use mimalloc::MiMalloc;
use pump_backends::{CollectorSpec, DrainSpec, EnumeratorSpec};
use pump_engine::{LogProgress, NoProgress, Progress, Pump, PumpReport};
use tracing::{debug, error, info};

use crate::cli::{Args, ProgressMode};
use crate::error::Result;
use crate::progress::SpanProgress;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let guard = match logging::init_logging(args.verbose, args.quiet, args.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run(args).await {
        error!("Application error: {}", e);
        drop(guard);
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<PumpReport> {
    let config = args.pump_config();
    config.validate()?;

    let options = args.backend_options();
    let enumerator_spec = EnumeratorSpec::from_options(args.enumerator, &options)?;
    let collector_spec = CollectorSpec::from_options(args.collector, &options)?;
    let drain_spec = DrainSpec::from_options(args.drain, &options)?;
    debug!(?enumerator_spec, ?collector_spec, ?drain_spec, "Backends selected");

    let enumerator = enumerator_spec.build().await?;
    let collector = collector_spec.build().await?;
    let drain = drain_spec.build().await?;

    info!(
        enumerator = %args.enumerator,
        collector = %args.collector,
        drain = %args.drain,
        workers = config.workers,
        "Starting migration"
    );

    let progress: Arc<dyn Progress> = match args.progress {
        ProgressMode::Bar => Arc::new(SpanProgress::new()),
        ProgressMode::Log => Arc::new(LogProgress),
        ProgressMode::Off => Arc::new(NoProgress),
    };

    let report = Pump::new(config)
        .with_progress(progress)
        .run(enumerator, collector, drain)
        .await?;
    Ok(report)
}
