//! Trading Context Port (Driven Port)

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::Security;

/// Per-step view of the host strategy.
pub trait TradingContext {
    /// Trade (account) name; scopes the global cache.
    fn trade_name(&self) -> &str;

    /// Strategy instance id; scopes the local cache.
    fn instance_id(&self) -> &str;

    /// True when new trading is globally blocked.
    fn is_trading_blocked(&self) -> bool;

    /// Current instrument universe.
    fn securities(&self) -> Vec<Arc<dyn Security>>;

    /// Wall clock.
    fn now(&self) -> DateTime<Utc>;

    /// Ask the host to schedule another evaluation step.
    fn recalc(&self, reason: &str);
}
