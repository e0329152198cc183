//! Logging setup
//!
//! The engine only emits `tracing` events; installing a subscriber is left to
//! the host process. [`init_logging`] is the stock setup.

use crate::config::LoggingConfig;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Default log file location when file logging is requested without a path
pub fn default_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("restform").join("restform.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".restform").join("restform.log");
    }
    PathBuf::from("restform.log")
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a global fmt subscriber
///
/// Writes to stderr, or through a non-blocking file appender when
/// `config.to_file` or `config.file` is set. The returned guard must be kept
/// alive for the file writer to flush. A second call leaves the first
/// subscriber in place.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = env_filter(&config.level);

    let path = match (&config.file, config.to_file) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(default_log_path()),
        (None, false) => None,
    };

    let Some(path) = path else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();
        return None;
    };

    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("restform: cannot open log file {:?}: {}", path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .try_init()
        .is_ok();

    if !installed {
        return None;
    }

    tracing::info!("Log file: {:?}", path);
    Some(guard)
}
