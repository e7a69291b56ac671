//! Smile Context
//!
//! A smile maps strike to implied volatility on top of a forward, a time to
//! expiry and a risk-free rate. Smiles are immutable: shifting one produces a
//! new instance.

mod curve;
mod smile_info;

use thiserror::Error;

pub use curve::{FlatCurve, InterpolatedCurve, ShiftedCurve, VolCurve};
pub use smile_info::{OptionQuote, SmileInfo};

/// Errors building a smile.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SmileError {
    /// No points were supplied.
    #[error("Smile curve needs at least one point")]
    EmptyCurve,

    /// A point is not finite or has a non-positive strike or volatility.
    #[error("Invalid smile point: strike {strike}, volatility {volatility}")]
    InvalidPoint {
        /// Strike of the offending point.
        strike: f64,
        /// Volatility of the offending point.
        volatility: f64,
    },

    /// Two points share a strike.
    #[error("Duplicate smile strike: {strike}")]
    DuplicateStrike {
        /// Duplicated strike.
        strike: f64,
    },

    /// None of the quotes could be inverted to a volatility.
    #[error("None of the {count} quotes produced an implied volatility")]
    NoSolvableQuotes {
        /// Number of quotes tried.
        count: usize,
    },
}
