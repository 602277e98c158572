//! File logging
//!
//! stdout and stderr belong to the shell, so diagnostics go to a file through
//! a non-blocking writer. `GHOSTSHELL_LOG` takes an `EnvFilter` directive and
//! overrides the level.

use std::fs::OpenOptions;
use std::path::PathBuf;

use clap::ValueEnum;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const LOG_FILTER_ENV: &str = "GHOSTSHELL_LOG";

#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Clone, Debug)]
pub struct LogConfig {
    pub level: LogLevel,
    pub file: PathBuf,
}

#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("failed to open log file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to configure logger: {0}")]
    Configure(String),
}

/// Install the global subscriber.
///
/// Buffered lines are written out when the returned guard drops, so keep it
/// alive until just before the process exits.
pub fn init(config: &LogConfig) -> Result<WorkerGuard, InitError> {
    if let Some(parent) = config.file.parent() {
        std::fs::create_dir_all(parent).map_err(|source| InitError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.file)
        .map_err(|source| InitError::Io {
            path: config.file.clone(),
            source,
        })?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(config.level))
        .with_level(true)
        .with_target(config.level >= LogLevel::Debug)
        .with_thread_ids(config.level >= LogLevel::Trace)
        .with_ansi(false)
        .with_writer(writer)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| InitError::Configure(err.to_string()))?;

    Ok(guard)
}

fn build_env_filter(level: LogLevel) -> EnvFilter {
    if let Ok(filter) = std::env::var(LOG_FILTER_ENV) {
        return EnvFilter::new(filter);
    }
    // keep HTTP client internals out of the file unless tracing everything
    let deps = if level >= LogLevel::Trace { level } else { LogLevel::Warn.min(level) };
    EnvFilter::new(format!(
        "{},hyper={},reqwest={},rustls={}",
        level.as_str(),
        deps.as_str(),
        deps.as_str(),
        deps.as_str()
    ))
}
