//! Security Port (Driven Port)
//!
//! A live instrument and its position book, as provided by the host.

use chrono::{DateTime, TimeDelta, Utc};
use std::fmt::Debug;
use thiserror::Error;

use crate::domain::position::{PositionId, PositionSnapshot};
use crate::domain::security::SecurityIdentity;
use crate::domain::shared::Side;

/// Errors reported by the host position book.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The position id is unknown to the book.
    #[error("Position not found: {0}")]
    PositionNotFound(PositionId),

    /// The operation requires a virtual position.
    #[error("Position {0} is not virtual")]
    NotVirtual(PositionId),

    /// The host refused the order.
    #[error("Order rejected: {reason}")]
    Rejected {
        /// Host reason.
        reason: String,
    },
}

/// Order parameters for opening a position.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTicket {
    /// Bar the position is opened at.
    pub bar: usize,
    /// Direction.
    pub side: Side,
    /// Unsigned quantity.
    pub qty: f64,
    /// Limit or fill price.
    pub price: f64,
    /// Signal name.
    pub signal_name: String,
    /// Free-text notes.
    pub notes: String,
}

impl OrderTicket {
    /// Signed quantity.
    #[must_use]
    pub fn signed_qty(&self) -> f64 {
        self.side.signed(self.qty)
    }
}

/// A live security handle.
pub trait Security: Debug {
    /// Identity used to match stored records.
    fn identity(&self) -> &SecurityIdentity;

    /// Number of bars currently available.
    fn bars_count(&self) -> usize;

    /// True once the full bar history has been loaded.
    fn is_bars_loaded(&self) -> bool;

    /// True once the account/portfolio state for this security is known.
    fn is_portfolio_ready(&self) -> bool;

    /// Timestamp of the last bar.
    fn last_bar_time(&self) -> Option<DateTime<Utc>>;

    /// Nominal bar interval.
    fn bar_interval(&self) -> TimeDelta;

    /// Minimal tradable quantity increment.
    fn lot_size(&self) -> f64;

    /// Minimal price increment.
    fn price_step(&self) -> f64;

    /// Every position in the book, real and virtual, open and closed.
    fn positions(&self) -> Vec<PositionSnapshot>;

    /// Create a simulated position.
    ///
    /// # Errors
    ///
    /// Host rejection.
    fn make_virtual_position(&self, ticket: &OrderTicket) -> Result<PositionSnapshot, HostError>;

    /// Send a real order opening a new position.
    ///
    /// # Errors
    ///
    /// Host rejection.
    fn open_position(&self, ticket: &OrderTicket) -> Result<PositionSnapshot, HostError>;

    /// Change an existing position to `new_signed_qty` at `price`.
    ///
    /// # Errors
    ///
    /// Unknown position or host rejection.
    fn change_position(
        &self,
        id: PositionId,
        bar: usize,
        new_signed_qty: f64,
        price: f64,
        notes: &str,
    ) -> Result<PositionSnapshot, HostError>;

    /// Remove a simulated position from the book.
    ///
    /// # Errors
    ///
    /// Unknown position, or the position is real.
    fn cancel_virtual_position(&self, id: PositionId) -> Result<(), HostError>;
}
