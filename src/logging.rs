use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::LoggingError;

/// Initializes the logging system with both console and file output.
///
/// The returned guard must be held for the life of the process so buffered
/// file output is flushed on exit. An unusable log directory is reported as
/// an error before any subscriber is installed.
pub fn init_logging(log_dir: &Path) -> Result<WorkerGuard, LoggingError> {
    fs::create_dir_all(log_dir).map_err(|source| LoggingError::Directory {
        path: log_dir.display().to_string(),
        source,
    })?;

    // Daily rotation, non-blocking writes
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("rayos.log")
        .build(log_dir)?;
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    // JSON for the file, human-readable for the console
    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);
    let console_layer = fmt::layer().with_writer(std::io::stdout);

    let default_directive: Directive = "rayos_ingest=info"
        .parse()
        .unwrap_or_else(|_| LevelFilter::INFO.into());

    // No-op when a subscriber is already installed
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(default_directive))
        .with(file_layer)
        .with(console_layer)
        .try_init();

    Ok(guard)
}
