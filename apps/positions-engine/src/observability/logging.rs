//! `tracing-subscriber` setup.
//!
//! # Example
//!
//! ```ignore
//! use positions_engine::config::LoggingConfig;
//! use positions_engine::observability::init_logging;
//!
//! init_logging(&LoggingConfig::default())?;
//! ```
//!
//! # Key Spans
//!
//! - `positions.step` - One `execute` call
//! - `positions.restore` - Replay of stored virtual positions
//! - `positions.intents` - Volatility intent draining
//! - `positions.effective_iv` - Effective-IV root search

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{LogFormat, LoggingConfig};

/// Errors from installing the global subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The configured level is not a valid filter directive.
    #[error("Invalid log level '{level}': {message}")]
    InvalidLevel {
        /// Configured level.
        level: String,
        /// Parser message.
        message: String,
    },

    /// A global subscriber is already installed.
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `config.level` when set.
///
/// # Errors
///
/// `InvalidLevel` for an unparsable level, `AlreadyInitialized` when called twice.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| LoggingError::InvalidLevel {
            level: config.level.clone(),
            message: e.to_string(),
        })?,
    };

    let result = if config.format == LogFormat::Pretty {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(config.include_spans)
                    .with_span_list(config.include_spans),
            )
            .try_init()
    };
    result.map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    tracing::info!(level = %config.level, format = %config.format, "Logging initialized");
    Ok(())
}

/// Span names used across the engine.
pub mod span_names {
    /// One evaluation step.
    pub const STEP: &str = "positions.step";
    /// Virtual position restore.
    pub const RESTORE: &str = "positions.restore";
    /// Volatility intent draining.
    pub const INTENTS: &str = "positions.intents";
    /// Effective-IV search.
    pub const EFFECTIVE_IV: &str = "positions.effective_iv";
}
