//! Option pricing primitives.
//!
//! - [`black`]: Black (forward) prices and vega
//! - [`iv`]: Implied volatility solver (Newton-Raphson with bisection fallback)

pub mod black;
pub mod iv;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use black::{option_price, try_option_price, vega};
pub use iv::{IvError, IvSolver, IvSolverConfig};

/// Option type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionKind {
    /// Call option.
    Call,
    /// Put option.
    Put,
}

impl OptionKind {
    /// True for calls.
    #[must_use]
    pub const fn is_call(self) -> bool {
        matches!(self, Self::Call)
    }
}

impl std::fmt::Display for OptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "CALL"),
            Self::Put => write!(f, "PUT"),
        }
    }
}

/// Errors from pricing an option or reading a smile.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    /// Invalid pricing input.
    #[error("Invalid pricing input: {message}")]
    InvalidInput {
        /// Error message.
        message: String,
    },

    /// The smile cannot produce a usable volatility at this strike.
    #[error("No valid volatility at strike {strike} (got {value})")]
    NoVolatility {
        /// Strike that was queried.
        strike: f64,
        /// Value the smile returned.
        value: f64,
    },
}

impl PricingError {
    /// Stable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "INVALID_PRICING_INPUT",
            Self::NoVolatility { .. } => "NO_VOLATILITY",
        }
    }
}
