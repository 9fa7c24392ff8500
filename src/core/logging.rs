//! Diagnostic logging setup

use serde::Deserialize;
use std::fmt as std_fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding a filter directive, checked before `RUST_LOG`
pub const LOG_ENV: &str = "RTT_LOG";

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Level selected by the `--verbose` / `--quiet` flags
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        match (verbose, quiet) {
            (true, _) => LogLevel::Debug,
            (false, true) => LogLevel::Error,
            (false, false) => LogLevel::Warn,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line human-readable records
    #[default]
    Compact,
    /// One JSON object per record
    Json,
}

impl std_fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std_fmt::Formatter<'_>) -> std_fmt::Result {
        match self {
            LogFormat::Compact => write!(f, "compact"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" | "text" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {} (valid: compact, json)", s)),
        }
    }
}

#[derive(Debug, Error)]
pub enum LogError {
    #[error("failed to initialize logging: {0}")]
    Init(String),
}

/// Build the event filter
///
/// `RTT_LOG` wins, then `RUST_LOG`, then `level`.
pub fn build_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Install the global subscriber, writing to stderr
pub fn init(level: LogLevel, format: LogFormat) -> Result<(), LogError> {
    let registry = tracing_subscriber::registry().with(build_filter(level));

    match format {
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr);
            registry
                .with(layer)
                .try_init()
                .map_err(|e| LogError::Init(e.to_string()))
        }
        LogFormat::Json => {
            let layer = fmt::layer().json().with_writer(std::io::stderr);
            registry
                .with(layer)
                .try_init()
                .map_err(|e| LogError::Init(e.to_string()))
        }
    }
}
