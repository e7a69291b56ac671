//! Intent Context
//!
//! Orders that are decided now but executed on a later bar:
//! - [`IvTarget`]: reach a target quantity by quoting at a volatility level
//! - [`PendingOrder`]: a fixed-price order queued outside the bar loop

mod iv_target;
mod pending_order;

pub use iv_target::{IvTarget, QuoteMode, VolQuote};
pub use pending_order::PendingOrder;
