//! Pricing configuration.

use serde::{Deserialize, Serialize};

use crate::pricing::IvSolverConfig;

/// Pricing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PricingConfig {
    /// Implied volatility solver used to build smiles from quotes.
    #[serde(default)]
    pub iv_solver: IvSolverConfig,
}
