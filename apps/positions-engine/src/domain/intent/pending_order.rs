//! Fixed-price order queued outside the bar loop.

use serde::{Deserialize, Serialize};

use crate::domain::security::SecurityIdentity;
use crate::domain::shared::Side;

/// An order requested asynchronously (e.g. by a chart click) and executed on
/// the next evaluation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOrder {
    /// Target security.
    pub security: SecurityIdentity,
    /// Buy for long, sell for short.
    pub side: Side,
    /// Unsigned quantity.
    pub qty: f64,
    /// Limit price.
    pub price: f64,
    /// Signal name.
    pub signal_name: String,
    /// Free-text notes.
    #[serde(default)]
    pub notes: String,
}

impl PendingOrder {
    /// Create a pending order. A negative quantity flips the side.
    #[must_use]
    pub fn new(
        security: SecurityIdentity,
        side: Side,
        qty: f64,
        price: f64,
        signal_name: impl Into<String>,
    ) -> Self {
        let side = if qty < 0.0 { side.opposite() } else { side };
        Self {
            security,
            side,
            qty: qty.abs(),
            price,
            signal_name: signal_name.into(),
            notes: String::new(),
        }
    }

    /// Attach notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}
