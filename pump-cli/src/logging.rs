use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::error::{AppError, Result};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "pump=info,pump_engine=info,pump_backends=info";

const VERBOSE_LOG_FILTER: &str = "pump=debug,pump_engine=debug,pump_backends=debug";

fn build_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new(VERBOSE_LOG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    }
}

/// Install the global subscriber.
///
/// Console output goes through the progress bar's writer so log lines never
/// tear the bar. When `log_file` is set the same events are also appended to
/// it from a background thread; keep the returned guard alive until exit so
/// buffered lines are flushed.
pub fn init_logging(
    verbose: bool,
    quiet: bool,
    log_file: Option<&Path>,
) -> Result<Option<WorkerGuard>> {
    let indicatif_layer = IndicatifLayer::new();
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(indicatif_layer.get_stderr_writer());

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| AppError::Logging(format!("invalid log file {}", path.display())))?;

            let appender = tracing_appender::rolling::never(directory, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(non_blocking).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(build_filter(verbose, quiet))
        .with(console_layer)
        .with(file_layer)
        .with(indicatif_layer)
        .try_init()
        .map_err(|e| AppError::Logging(format!("Failed to set global default subscriber: {e}")))?;

    Ok(guard)
}
