//! Volatility intent queues, one list per side.

use super::{ListStore, StoreScope};
use crate::application::ports::{KeyValueStore, StoreKind};
use crate::domain::intent::IvTarget;
use crate::domain::security::SecurityIdentity;
use crate::domain::shared::Side;
use crate::error::PersistenceError;

/// Long and short intent lists of one manager.
pub struct IvTargetStore<'a> {
    long: ListStore<'a, IvTarget>,
    short: ListStore<'a, IvTarget>,
}

impl<'a> IvTargetStore<'a> {
    /// Stores of `scope` in `store`.
    #[must_use]
    pub fn new(store: &'a dyn KeyValueStore, scope: &StoreScope) -> Self {
        Self {
            long: ListStore::new(store, scope.key(StoreKind::LongIntents)),
            short: ListStore::new(store, scope.key(StoreKind::ShortIntents)),
        }
    }

    const fn list(&self, side: Side) -> &ListStore<'a, IvTarget> {
        match side {
            Side::Long => &self.long,
            Side::Short => &self.short,
        }
    }

    /// Intents of one side.
    ///
    /// # Errors
    ///
    /// Decode failure.
    pub fn load(&self, side: Side) -> Result<Vec<IvTarget>, PersistenceError> {
        self.list(side).load()
    }

    /// Insert `target`, replacing any intent for the same security and side.
    ///
    /// # Errors
    ///
    /// Decode or encode failure.
    pub fn replace(&self, target: IvTarget) -> Result<(), PersistenceError> {
        self.list(target.side).update(|items| {
            items.retain(|t| t.security != target.security);
            items.push(target);
        })
    }

    /// Remove the intent of `side` for exactly `security`.
    ///
    /// # Errors
    ///
    /// Decode or encode failure.
    pub fn remove(&self, side: Side, security: &SecurityIdentity) -> Result<usize, PersistenceError> {
        self.list(side).update(|items| {
            let before = items.len();
            items.retain(|t| &t.security != security);
            before - items.len()
        })
    }

    /// Remove intents of `side` whose security full name matches,
    /// ignoring case. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Decode or encode failure.
    pub fn cancel_by_name(&self, side: Side, full_name: &str) -> Result<usize, PersistenceError> {
        self.list(side).update(|items| {
            let before = items.len();
            items.retain(|t| !t.security.full_name_matches(full_name));
            before - items.len()
        })
    }

    /// Drop one side. Returns the prior count.
    ///
    /// # Errors
    ///
    /// Decode failure.
    pub fn clear(&self, side: Side) -> Result<usize, PersistenceError> {
        self.list(side).clear()
    }
}
