//! Simulated host.
//!
//! - [`SimSecurity`]: a security with bar state and an in-memory position book
//! - [`SimContext`]: trading context with a mutable universe and clock

mod context;
mod security;

pub use context::SimContext;
pub use security::SimSecurity;
