//! Domain Layer
//!
//! Value objects and pure rules with no host dependencies.
//!
//! # Bounded Contexts
//!
//! - [`security`]: Instrument identity used as the key of every stored record
//! - [`position`]: Position records, live position snapshots, aggregation filters
//! - [`intent`]: Volatility targets and pending click orders
//! - [`smile`]: Strike to implied-volatility curves
//! - [`shared`]: Tolerance comparisons, sides, lot rounding

pub mod intent;
pub mod position;
pub mod security;
pub mod shared;
pub mod smile;
