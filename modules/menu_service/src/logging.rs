//! Tracing subscriber setup for processes embedding the menu service

use crate::config::Config;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("Failed to initialize logging: {0}")]
    Initialization(String),
}

/// Build the filter from `RUST_LOG`, falling back to `default_level`
pub fn env_filter(default_level: &str) -> Result<EnvFilter, LoggingError> {
    match std::env::var("RUST_LOG") {
        Ok(filter) if !filter.trim().is_empty() => EnvFilter::try_new(&filter)
            .map_err(|e| LoggingError::InvalidFilter {
                filter,
                reason: e.to_string(),
            }),
        _ => EnvFilter::try_new(default_level).map_err(|e| LoggingError::InvalidFilter {
            filter: default_level.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Install the global subscriber: human-readable or JSON lines on stderr
pub fn init_logging(default_level: &str, json: bool) -> Result<(), LoggingError> {
    let filter = env_filter(default_level)?;

    let layer = if json {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| LoggingError::Initialization(e.to_string()))
}

/// Install logging with the level and format from the module configuration
pub fn init_from_config(config: &Config) -> Result<(), LoggingError> {
    init_logging(&config.log_level, config.log_json)
}
