//! Log setup. The terminal belongs to the UI, so logs always go to a file.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to open log file {path}: {source}")]
    Open { path: String, source: io::Error },
    #[error("failed to install subscriber: {0}")]
    Install(String),
}

/// Builds the filter: `RUST_LOG` wins, then the configured level, then `info`.
pub fn build_filter(level: &str) -> EnvFilter {
    filter_from(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(), level)
}

fn filter_from(env: Option<&str>, level: &str) -> EnvFilter {
    env.and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn open_log_file(path: &Path) -> Result<File, TelemetryError> {
    let open = || -> io::Result<File> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        OpenOptions::new().create(true).append(true).open(path)
    };
    open().map_err(|source| TelemetryError::Open {
        path: path.display().to_string(),
        source,
    })
}

pub fn init(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let file = open_log_file(&config.file)?;
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(&config.level))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| TelemetryError::Install(e.to_string()))
}
