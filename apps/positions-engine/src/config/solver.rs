//! Effective-IV solver configuration.

use serde::{Deserialize, Serialize};

/// Settings of the effective-IV root search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Volatility step per iteration.
    #[serde(default = "default_initial_step")]
    pub initial_step: f64,
    /// Steps taken before giving up.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// PnL magnitude treated as zero.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            initial_step: default_initial_step(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
        }
    }
}

const fn default_initial_step() -> f64 {
    0.005
}

const fn default_max_iterations() -> u32 {
    400
}

const fn default_tolerance() -> f64 {
    1e-9
}
