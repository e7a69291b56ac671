//! In-memory security and position book.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::application::ports::{HostError, OrderTicket, Security};
use crate::domain::position::{PositionId, PositionSnapshot};
use crate::domain::security::SecurityIdentity;
use crate::domain::shared::Side;
use crate::domain::shared::tolerance::{is_negative, is_zero};

#[derive(Debug)]
struct SimState {
    bars_count: usize,
    bars_loaded: bool,
    portfolio_ready: bool,
    last_bar_time: Option<DateTime<Utc>>,
    bar_interval: TimeDelta,
    lot_size: f64,
    price_step: f64,
    rejection: Option<String>,
    next_id: u64,
    positions: Vec<PositionSnapshot>,
}

/// Security whose position book lives in memory.
///
/// Orders fill immediately at the ticket price. `change_position` moves the
/// position to the new quantity and re-marks its average price to the given
/// price; a zero quantity closes it.
#[derive(Debug)]
pub struct SimSecurity {
    identity: SecurityIdentity,
    state: RwLock<SimState>,
}

impl SimSecurity {
    /// Loaded, ready security with 10 bars, 1-minute interval, lot 1 and step 0.01.
    #[must_use]
    pub fn new(identity: SecurityIdentity) -> Self {
        Self {
            identity,
            state: RwLock::new(SimState {
                bars_count: 10,
                bars_loaded: true,
                portfolio_ready: true,
                last_bar_time: None,
                bar_interval: TimeDelta::minutes(1),
                lot_size: 1.0,
                price_step: 0.01,
                rejection: None,
                next_id: 1,
                positions: Vec::new(),
            }),
        }
    }

    /// Set the bar count.
    #[must_use]
    pub fn with_bars(self, count: usize) -> Self {
        self.set_bars_count(count);
        self
    }

    /// Set the lot size.
    #[must_use]
    pub fn with_lot_size(self, lot_size: f64) -> Self {
        self.write().lot_size = lot_size;
        self
    }

    /// Set the price step.
    #[must_use]
    pub fn with_price_step(self, price_step: f64) -> Self {
        self.write().price_step = price_step;
        self
    }

    /// Set the bar interval.
    #[must_use]
    pub fn with_bar_interval(self, interval: TimeDelta) -> Self {
        self.write().bar_interval = interval;
        self
    }

    /// Change the bar count.
    pub fn set_bars_count(&self, count: usize) {
        self.write().bars_count = count;
    }

    /// Add `bars` new bars.
    pub fn advance(&self, bars: usize) {
        let mut state = self.write();
        state.bars_count += bars;
        if let Some(time) = state.last_bar_time {
            let step = state.bar_interval * i32::try_from(bars).unwrap_or(i32::MAX);
            state.last_bar_time = Some(time + step);
        }
    }

    /// Mark bar history loaded or not.
    pub fn set_bars_loaded(&self, loaded: bool) {
        self.write().bars_loaded = loaded;
    }

    /// Mark portfolio state ready or not.
    pub fn set_portfolio_ready(&self, ready: bool) {
        self.write().portfolio_ready = ready;
    }

    /// Set the last bar timestamp.
    pub fn set_last_bar_time(&self, time: Option<DateTime<Utc>>) {
        self.write().last_bar_time = time;
    }

    /// Reject every subsequent order with `reason`, or accept again with `None`.
    pub fn set_rejection(&self, reason: Option<&str>) {
        self.write().rejection = reason.map(str::to_string);
    }

    /// Insert a position directly (test setup). The id is reassigned.
    pub fn seed_position(&self, mut position: PositionSnapshot) -> PositionId {
        let mut state = self.write();
        let id = PositionId::new(state.next_id);
        state.next_id += 1;
        position.id = id;
        state.positions.push(position);
        id
    }

    /// Drop every virtual position, as a host does when it rebuilds its
    /// in-memory state. Returns how many were dropped.
    pub fn forget_virtual_positions(&self) -> usize {
        let mut state = self.write();
        let before = state.positions.len();
        state.positions.retain(|p| !p.is_virtual);
        before - state.positions.len()
    }

    fn read(&self) -> RwLockReadGuard<'_, SimState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SimState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn fill(&self, ticket: &OrderTicket, is_virtual: bool) -> Result<PositionSnapshot, HostError> {
        let mut state = self.write();
        if let Some(reason) = &state.rejection {
            return Err(HostError::Rejected {
                reason: reason.clone(),
            });
        }
        let id = PositionId::new(state.next_id);
        state.next_id += 1;
        let position = PositionSnapshot::open(id, ticket.side, ticket.qty, ticket.price, ticket.bar)
            .with_virtual(is_virtual)
            .with_signal(ticket.signal_name.clone(), ticket.notes.clone());
        state.positions.push(position.clone());
        debug!(security = %self.identity, %id, is_virtual, bar = ticket.bar, "Position opened");
        Ok(position)
    }
}

impl Security for SimSecurity {
    fn identity(&self) -> &SecurityIdentity {
        &self.identity
    }

    fn bars_count(&self) -> usize {
        self.read().bars_count
    }

    fn is_bars_loaded(&self) -> bool {
        self.read().bars_loaded
    }

    fn is_portfolio_ready(&self) -> bool {
        self.read().portfolio_ready
    }

    fn last_bar_time(&self) -> Option<DateTime<Utc>> {
        self.read().last_bar_time
    }

    fn bar_interval(&self) -> TimeDelta {
        self.read().bar_interval
    }

    fn lot_size(&self) -> f64 {
        self.read().lot_size
    }

    fn price_step(&self) -> f64 {
        self.read().price_step
    }

    fn positions(&self) -> Vec<PositionSnapshot> {
        self.read().positions.clone()
    }

    fn make_virtual_position(&self, ticket: &OrderTicket) -> Result<PositionSnapshot, HostError> {
        self.fill(ticket, true)
    }

    fn open_position(&self, ticket: &OrderTicket) -> Result<PositionSnapshot, HostError> {
        self.fill(ticket, false)
    }

    fn change_position(
        &self,
        id: PositionId,
        bar: usize,
        new_signed_qty: f64,
        price: f64,
        notes: &str,
    ) -> Result<PositionSnapshot, HostError> {
        let mut state = self.write();
        if let Some(reason) = &state.rejection {
            return Err(HostError::Rejected {
                reason: reason.clone(),
            });
        }
        let position = state
            .positions
            .iter_mut()
            .find(|p| p.id == id && p.exit_bar.is_none())
            .ok_or(HostError::PositionNotFound(id))?;

        if is_negative(position.side.sign() * new_signed_qty) {
            return Err(HostError::Rejected {
                reason: format!("cannot turn a {} position into {new_signed_qty}", position.side),
            });
        }
        if is_zero(new_signed_qty) {
            position.exit_bar = Some(bar);
            position.exit_price = Some(price);
        } else {
            position.shares = new_signed_qty;
            position.average_entry_price = price;
        }
        if !notes.is_empty() {
            position.notes = notes.to_string();
        }
        Ok(position.clone())
    }

    fn cancel_virtual_position(&self, id: PositionId) -> Result<(), HostError> {
        let mut state = self.write();
        let idx = state
            .positions
            .iter()
            .position(|p| p.id == id)
            .ok_or(HostError::PositionNotFound(id))?;
        if !state.positions[idx].is_virtual {
            return Err(HostError::NotVirtual(id));
        }
        state.positions.remove(idx);
        Ok(())
    }
}

impl SimSecurity {
    /// Open positions of `side`, real or virtual as requested.
    #[must_use]
    pub fn open_positions(&self, side: Side, is_virtual: bool) -> Vec<PositionSnapshot> {
        self.read()
            .positions
            .iter()
            .filter(|p| p.side == side && p.is_virtual == is_virtual && p.exit_bar.is_none())
            .cloned()
            .collect()
    }
}
