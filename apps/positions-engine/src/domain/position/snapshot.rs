//! Snapshot of a live position owned by the host position book.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::Side;

/// Host-assigned handle of a live position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionId(u64);

impl PositionId {
    /// Wrap a raw host id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw host id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pos-{}", self.0)
    }
}

/// Read-only copy of a host position.
///
/// The core never owns live positions. It observes them through snapshots and
/// mutates them by id through the `Security` port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    /// Host handle.
    pub id: PositionId,
    /// Direction.
    pub side: Side,
    /// True for simulated positions.
    pub is_virtual: bool,
    /// Signed share count (negative for shorts).
    pub shares: f64,
    /// Price of the opening fill.
    pub entry_price: f64,
    /// Average price over all fills of the position.
    pub average_entry_price: f64,
    /// Price of the closing fill, once closed.
    pub exit_price: Option<f64>,
    /// Bar at which the position was opened.
    pub entry_bar: usize,
    /// Bar at which the position was closed.
    pub exit_bar: Option<usize>,
    /// Commission paid on entry.
    pub entry_commission: f64,
    /// Commission paid on exit.
    pub exit_commission: f64,
    /// Signal name the position was opened with.
    pub signal_name: String,
    /// Free-text notes.
    pub notes: String,
}

impl PositionSnapshot {
    /// An open position with no commissions, signal or notes.
    #[must_use]
    pub fn open(id: PositionId, side: Side, qty: f64, price: f64, entry_bar: usize) -> Self {
        Self {
            id,
            side,
            is_virtual: false,
            shares: side.signed(qty),
            entry_price: price,
            average_entry_price: price,
            exit_price: None,
            entry_bar,
            exit_bar: None,
            entry_commission: 0.0,
            exit_commission: 0.0,
            signal_name: String::new(),
            notes: String::new(),
        }
    }

    /// Mark as virtual (or real).
    #[must_use]
    pub const fn with_virtual(mut self, is_virtual: bool) -> Self {
        self.is_virtual = is_virtual;
        self
    }

    /// Set entry and exit commissions.
    #[must_use]
    pub const fn with_commissions(mut self, entry: f64, exit: f64) -> Self {
        self.entry_commission = entry;
        self.exit_commission = exit;
        self
    }

    /// Mark as closed at `bar` for `price`.
    #[must_use]
    pub const fn closed_at(mut self, bar: usize, price: f64) -> Self {
        self.exit_bar = Some(bar);
        self.exit_price = Some(price);
        self
    }

    /// Set signal name and notes.
    #[must_use]
    pub fn with_signal(mut self, signal_name: impl Into<String>, notes: impl Into<String>) -> Self {
        self.signal_name = signal_name.into();
        self.notes = notes.into();
        self
    }

    /// True for long positions.
    #[must_use]
    pub const fn is_long(&self) -> bool {
        self.side.is_long()
    }

    /// Unsigned share count.
    #[must_use]
    pub fn abs_shares(&self) -> f64 {
        self.shares.abs()
    }

    /// `sign(is_long) * |shares|`, independent of how the host signs `shares`.
    #[must_use]
    pub fn signed_shares(&self) -> f64 {
        self.side.signed(self.shares)
    }

    /// Open at `bar`: entered at or before it and not yet exited.
    #[must_use]
    pub fn is_active_for_bar(&self, bar: usize) -> bool {
        self.entry_bar <= bar && self.exit_bar.is_none_or(|exit| exit > bar)
    }

    /// Closed at or before `bar`.
    #[must_use]
    pub fn is_closed_by(&self, bar: usize) -> bool {
        self.exit_bar.is_some_and(|exit| exit <= bar)
    }

    /// Entered at or before `bar`, whether still open or already closed.
    #[must_use]
    pub const fn is_closed_or_active_for_bar(&self, bar: usize) -> bool {
        self.entry_bar <= bar
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long(entry: usize) -> PositionSnapshot {
        PositionSnapshot::open(PositionId::new(7), Side::Long, 10.0, 100.0, entry)
    }

    #[test]
    fn open_position_signs_shares() {
        let short = PositionSnapshot::open(PositionId::new(1), Side::Short, 4.0, 5.0, 0);
        assert_eq!(short.shares, -4.0);
        assert_eq!(short.signed_shares(), -4.0);
        assert_eq!(short.abs_shares(), 4.0);
        assert!(!short.is_long());
    }

    #[test]
    fn activity_window_is_entry_inclusive_exit_exclusive() {
        let pos = long(5).closed_at(9, 101.0);
        assert!(!pos.is_active_for_bar(4));
        assert!(pos.is_active_for_bar(5));
        assert!(pos.is_active_for_bar(8));
        assert!(!pos.is_active_for_bar(9));
        assert!(pos.is_closed_by(9));
        assert!(!pos.is_closed_by(8));
        assert!(pos.is_closed_or_active_for_bar(12));
        assert!(!pos.is_closed_or_active_for_bar(4));
    }

    #[test]
    fn open_position_stays_active() {
        let pos = long(3);
        assert!(pos.is_active_for_bar(1_000));
        assert!(!pos.is_closed_by(1_000));
    }

    #[test]
    fn id_display() {
        assert_eq!(PositionId::new(42).to_string(), "pos-42");
        assert_eq!(PositionId::new(42).get(), 42);
    }
}
