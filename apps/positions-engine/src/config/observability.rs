//! Logging settings for the per-bar step.
//!
//! The engine logs one `positions.step` span per `execute` call, with
//! `positions.restore`, `positions.intents` and `positions.effective_iv`
//! nested under it. Corrupt stores and dropped orders are logged at `warn`
//! with `highlight = true`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The `observability` section of the engine config.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ObservabilityConfig {
    /// Subscriber settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Subscriber output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event, for hosts that ship logs.
    #[default]
    Json,
    /// Multi-line human output for interactive runs.
    Pretty,
}

impl LogFormat {
    /// Config spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input to [`crate::observability::init_logging`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `positions_engine=debug`.
    /// Ignored when `RUST_LOG` is set.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Defaults to JSON.
    #[serde(default)]
    pub format: LogFormat,
    /// Attach the enclosing step spans to JSON events. No effect on `pretty`.
    #[serde(default = "default_true")]
    pub include_spans: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            include_spans: true,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("json", LogFormat::Json)]
    #[test_case("pretty", LogFormat::Pretty)]
    fn format_names_round_trip(name: &str, format: LogFormat) {
        let parsed: LoggingConfig = match serde_yaml_bw::from_str(&format!("format: {name}")) {
            Ok(config) => config,
            Err(e) => panic!("parse: {e}"),
        };
        assert_eq!(parsed.format, format);
        assert_eq!(format.to_string(), name);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let parsed: LoggingConfig = match serde_yaml_bw::from_str("level: debug") {
            Ok(config) => config,
            Err(e) => panic!("parse: {e}"),
        };
        assert_eq!(parsed.level, "debug");
        assert_eq!(parsed.format, LogFormat::Json);
        assert!(parsed.include_spans);
    }
}
