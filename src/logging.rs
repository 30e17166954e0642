//! Logging setup for applications embedding hsql.
//!
//! hsql itself only emits `tracing` events: executor calls at debug level,
//! per-query and per-column detail at trace level. These helpers install a
//! `tracing-subscriber` filtered by `RUST_LOG` (default `info`).

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::error::{HsqlError, Result};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Sends log output to stderr.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_stderr_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .try_init();
}

/// Sends log output to `path`, truncating it first.
///
/// The parent directory is created when missing.
pub fn init_file_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| HsqlError::config(format!("Could not create log directory: {e}")))?;
    }

    let log_file = File::create(path)
        .map_err(|e| HsqlError::config(format!("Could not create log file: {e}")))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(log_file)
        .with_ansi(false)
        .try_init()
        .map_err(|e| HsqlError::config(format!("Logging already initialized: {e}")))
}

/// Default log file location.
///
/// Uses the XDG state directory on Linux (`~/.local/state/hsql/hsql.log`),
/// the config directory elsewhere, and the temp directory as a last resort.
pub fn default_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        return state_dir.join("hsql").join("hsql.log");
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("hsql").join("hsql.log");
    }

    std::env::temp_dir().join("hsql.log")
}
