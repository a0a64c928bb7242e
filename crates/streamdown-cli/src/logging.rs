//! Log subscriber setup.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use streamdown_core::config::Config;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "STREAMDOWN_LOG";
const DEFAULT_FILTER: &str = "warn";

/// Keeps the file writer flushing until dropped.
pub struct LogGuard {
    _worker: Option<WorkerGuard>,
}

/// Installs the global subscriber: stderr by default, or `log_file` from config.
pub fn init(config: &Config) -> Result<LogGuard> {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let Some(log_file) = config.log_file.as_deref() else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow!("Failed to install logger: {e}"))?;
        return Ok(LogGuard { _worker: None });
    };

    let path = Path::new(log_file);
    let file_name = path
        .file_name()
        .with_context(|| format!("log_file must name a file: {log_file}"))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let (writer, worker) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to install logger: {e}"))?;

    Ok(LogGuard {
        _worker: Some(worker),
    })
}
