//! Tracing setup for the `retrykit` binary.
//!
//! Events go to `$XDG_STATE_HOME/retrykit/retrykit.log` when that file can be
//! opened, otherwise to stderr. `RETRYKIT_LOG` (or `RUST_LOG`) overrides the
//! default filter.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Directive used when neither env var is set.
pub const DEFAULT_FILTER: &str = "info,retrykit=debug,retrykit_core=debug";

/// Env var checked before `RUST_LOG`.
pub const FILTER_ENV: &str = "RETRYKIT_LOG";

const LOG_FILE: &str = "retrykit.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(FILTER_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Path of the log file, creating its parent directory.
pub fn log_file_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("retrykit")?;
    xdg_dirs
        .place_state_file(LOG_FILE)
        .context("create retrykit state directory")
}

/// Open `path` for appending, creating it if missing.
pub fn open_log(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))
}

fn install<W>(writer: W) -> Result<()>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

/// Log to the state-dir file. Errors leave no subscriber installed, so the
/// caller can fall back to [`init_logging_stderr`].
pub fn init_logging() -> Result<()> {
    let path = log_file_path()?;
    let file = open_log(&path)?;
    install(Mutex::new(file))?;
    tracing::info!(path = %path.display(), "logging initialized");
    Ok(())
}

/// Log to stderr. A no-op if a subscriber is already installed.
pub fn init_logging_stderr() {
    let _ = install(io::stderr);
}
