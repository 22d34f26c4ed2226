//! Console and file logging.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::ValueEnum;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{Error, ErrorKind, Result};

/// Log file name inside the log directory.
pub const LOG_FILE_NAME: &str = "sf_export.log";

/// Threshold accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    /// No separate critical level exists; treated as `ERROR`.
    Critical,
}

impl LogLevel {
    /// Directive for [`EnvFilter`].
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

/// Path of the log file for a log directory.
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(LOG_FILE_NAME)
}

/// Install the global subscriber: stderr plus `<log_dir>/sf_export.log`.
///
/// `RUST_LOG` overrides `level` when set. The log directory is created if
/// needed and the file is appended to.
pub fn init(level: LogLevel, log_dir: &Path) -> Result<()> {
    fs::create_dir_all(log_dir).map_err(|e| {
        Error::with_source(
            ErrorKind::Logging(format!("cannot create {}: {}", log_dir.display(), e)),
            e,
        )
    })?;

    let path = log_file_path(log_dir);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| {
            Error::with_source(
                ErrorKind::Logging(format!("cannot open {}: {}", path.display(), e)),
                e,
            )
        })?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false),
        )
        .try_init()
        .map_err(|e| Error::with_source(ErrorKind::Logging(e.to_string()), e))
}
