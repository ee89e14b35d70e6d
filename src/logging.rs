//! Console + daily-rolling file logging for one run.

use crate::error::MonitorError;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_PREFIX: &str = "monobank";
const LOG_FILE_SUFFIX: &str = "log";
const MAX_LOG_FILES: usize = 30;

pub struct LoggingConfig {
    pub dir: PathBuf,
    /// Used when `RUST_LOG` is not set.
    pub default_level: String,
}

/// Keeps the file writer alive; dropping it flushes buffered lines.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _file: WorkerGuard,
    dir: PathBuf,
}

impl LogGuard {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Flush and stop the file writer.
    pub fn finish(self) {
        drop(self);
    }
}

/// Install the global subscriber. Call once per process.
pub fn init(cfg: &LoggingConfig) -> Result<LogGuard, MonitorError> {
    std::fs::create_dir_all(&cfg.dir)?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(MAX_LOG_FILES)
        .build(&cfg.dir)
        .map_err(|e| MonitorError::Logging(e.to_string()))?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.default_level.clone()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_level(true).with_target(false))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_level(true)
                .with_target(false)
                .with_writer(file_writer),
        )
        .try_init()
        .map_err(|e| MonitorError::Logging(e.to_string()))?;

    Ok(LogGuard {
        _file: guard,
        dir: cfg.dir.clone(),
    })
}
