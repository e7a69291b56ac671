//! Security Sources
//!
//! The two resolver adapters the reconciliation routine runs over:
//! - [`OptionSeries`]: an underlying plus the put/call pairs of one expiry
//! - [`SingleSecuritySource`]: one security

mod option_series;
mod single_security;

pub use option_series::{OptionSeries, StrikePair};
pub use single_security::SingleSecuritySource;
