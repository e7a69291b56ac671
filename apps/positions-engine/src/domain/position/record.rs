//! Persisted position record used to recreate virtual positions.

use serde::{Deserialize, Serialize};

use super::PositionSnapshot;
use crate::domain::shared::Side;

/// Snapshot of a virtual position as stored in the cache.
///
/// `shares` is never negative; the direction lives in `side`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    /// Bar index at which the position was opened.
    pub entry_bar: usize,
    /// Direction.
    pub side: Side,
    /// Unsigned share count.
    pub shares: f64,
    /// Entry (average) price.
    pub entry_price: f64,
    /// Signal name.
    pub signal_name: String,
    /// Free-text notes.
    #[serde(default)]
    pub notes: String,
}

impl PositionRecord {
    /// Create a record. The quantity is stored unsigned.
    #[must_use]
    pub fn new(
        entry_bar: usize,
        side: Side,
        shares: f64,
        entry_price: f64,
        signal_name: impl Into<String>,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            entry_bar,
            side,
            shares: shares.abs(),
            entry_price,
            signal_name: signal_name.into(),
            notes: notes.into(),
        }
    }

    /// Copy the persistent fields out of a live position.
    #[must_use]
    pub fn from_snapshot(position: &PositionSnapshot) -> Self {
        Self {
            entry_bar: position.entry_bar,
            side: position.side,
            shares: position.abs_shares(),
            entry_price: position.average_entry_price,
            signal_name: position.signal_name.clone(),
            notes: position.notes.clone(),
        }
    }

    /// `sign(side) * shares`.
    #[must_use]
    pub fn signed_shares(&self) -> f64 {
        self.side.signed(self.shares)
    }

    /// True for long records.
    #[must_use]
    pub const fn is_long(&self) -> bool {
        self.side.is_long()
    }
}
