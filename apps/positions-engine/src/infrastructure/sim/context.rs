//! In-memory trading context.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

use crate::application::ports::{Security, TradingContext};

/// Trading context with a settable universe, clock and blocked flag.
///
/// Recalculation requests are recorded instead of scheduled.
#[derive(Debug)]
pub struct SimContext {
    trade_name: String,
    instance_id: String,
    blocked: AtomicBool,
    now: RwLock<DateTime<Utc>>,
    securities: RwLock<Vec<Arc<dyn Security>>>,
    recalcs: RwLock<Vec<String>>,
}

impl SimContext {
    /// Empty universe, trading allowed, clock at the current time.
    #[must_use]
    pub fn new(trade_name: impl Into<String>, instance_id: impl Into<String>) -> Self {
        Self {
            trade_name: trade_name.into(),
            instance_id: instance_id.into(),
            blocked: AtomicBool::new(false),
            now: RwLock::new(Utc::now()),
            securities: RwLock::new(Vec::new()),
            recalcs: RwLock::new(Vec::new()),
        }
    }

    /// Add a security to the universe.
    pub fn add_security(&self, security: Arc<dyn Security>) {
        self.securities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(security);
    }

    /// Block or unblock new trading.
    pub fn set_trading_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Set the wall clock.
    pub fn set_now(&self, now: DateTime<Utc>) {
        *self.now.write().unwrap_or_else(PoisonError::into_inner) = now;
    }

    /// Reasons passed to `recalc`, oldest first.
    #[must_use]
    pub fn recalc_requests(&self) -> Vec<String> {
        self.recalcs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TradingContext for SimContext {
    fn trade_name(&self) -> &str {
        &self.trade_name
    }

    fn instance_id(&self) -> &str {
        &self.instance_id
    }

    fn is_trading_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    fn securities(&self) -> Vec<Arc<dyn Security>> {
        self.securities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn recalc(&self, reason: &str) {
        debug!(reason, "Recalculation requested");
        self.recalcs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(reason.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::security::SecurityIdentity;
    use crate::infrastructure::sim::SimSecurity;

    #[test]
    fn universe_and_flags() {
        let ctx = SimContext::new("acct", "42");
        ctx.add_security(Arc::new(SimSecurity::new(SecurityIdentity::new("DS", "A", "A"))));
        ctx.set_trading_blocked(true);
        ctx.recalc("click");

        assert_eq!(ctx.trade_name(), "acct");
        assert_eq!(ctx.instance_id(), "42");
        assert!(ctx.is_trading_blocked());
        assert_eq!(ctx.securities().len(), 1);
        assert_eq!(ctx.recalc_requests(), vec!["click".to_string()]);
    }
}
