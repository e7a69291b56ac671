//! Configuration module for the positions engine.
//!
//! Loads YAML with environment variable interpolation and validates the
//! result before any manager is built from it.
//!
//! # Usage
//!
//! ```rust,ignore
//! use positions_engine::config::load_config;
//!
//! let config = load_config(Some("positions.yaml"))?;
//! let manager = PositionsManager::new(config.manager.clone(), &cache);
//! ```

mod manager;
mod observability;
mod pricing;
mod solver;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use manager::ManagerConfig;
pub use observability::{LogFormat, LoggingConfig, ObservabilityConfig};
pub use pricing::PricingConfig;
pub use solver::SolverConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Position manager settings.
    #[serde(default)]
    pub manager: ManagerConfig,
    /// Effective-IV solver settings.
    #[serde(default)]
    pub solver: SolverConfig,
    /// Pricing settings.
    #[serde(default)]
    pub pricing: PricingConfig,
    /// Observability settings.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Load configuration from a YAML file with environment variable interpolation.
///
/// Defaults to `positions.yaml` when no path is given.
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("positions.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string.
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax. A variable that is
/// unset or empty takes the default, or the empty string without one.
#[allow(clippy::expect_used)] // Regex is a constant pattern
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map_or("", |m| m.as_str());
        match cap.get(1).map(|m| std::env::var(m.as_str())) {
            Some(Ok(v)) if !v.is_empty() => v,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let solver = &config.solver;
    if !solver.initial_step.is_finite() || solver.initial_step <= 0.0 {
        return Err(ConfigError::ValidationError(
            "solver.initial_step must be positive".to_string(),
        ));
    }
    if solver.max_iterations == 0 {
        return Err(ConfigError::ValidationError(
            "solver.max_iterations must be at least 1".to_string(),
        ));
    }
    if solver.tolerance.is_nan() || solver.tolerance < 0.0 {
        return Err(ConfigError::ValidationError(
            "solver.tolerance must not be negative".to_string(),
        ));
    }

    if config.manager.stale_bar_multiplier == 0 {
        return Err(ConfigError::ValidationError(
            "manager.stale_bar_multiplier must be at least 1".to_string(),
        ));
    }

    let iv = &config.pricing.iv_solver;
    if iv.min_vol <= 0.0 || iv.min_vol >= iv.max_vol {
        return Err(ConfigError::ValidationError(
            "pricing.iv_solver requires 0 < min_vol < max_vol".to_string(),
        ));
    }

    if config.observability.logging.level.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "observability.logging.level must not be empty".to_string(),
        ));
    }

    Ok(())
}
