//! Queue of fixed-price orders waiting for the next evaluation step.

use super::{ListStore, StoreScope};
use crate::application::ports::{KeyValueStore, StoreKind};
use crate::domain::intent::PendingOrder;
use crate::error::PersistenceError;

/// FIFO of pending orders.
pub struct PendingOrderStore<'a> {
    list: ListStore<'a, PendingOrder>,
}

impl<'a> PendingOrderStore<'a> {
    /// Queue of `scope` in `store`.
    #[must_use]
    pub fn new(store: &'a dyn KeyValueStore, scope: &StoreScope) -> Self {
        Self {
            list: ListStore::new(store, scope.key(StoreKind::PendingOrders)),
        }
    }

    /// Append an order.
    ///
    /// # Errors
    ///
    /// Decode or encode failure.
    pub fn push(&self, order: PendingOrder) -> Result<usize, PersistenceError> {
        self.list.update(|items| {
            items.push(order);
            items.len()
        })
    }

    /// Queued orders, oldest first.
    ///
    /// # Errors
    ///
    /// Decode failure.
    pub fn peek(&self) -> Result<Vec<PendingOrder>, PersistenceError> {
        self.list.load()
    }

    /// Remove and return every queued order, oldest first.
    ///
    /// # Errors
    ///
    /// Decode failure; the queue is left untouched in that case.
    pub fn take_all(&self) -> Result<Vec<PendingOrder>, PersistenceError> {
        let orders = self.list.load()?;
        self.list.save(&[])?;
        Ok(orders)
    }
}
