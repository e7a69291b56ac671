//! Index of virtual positions: `(SecurityIdentity, PositionRecord)` per side.

use serde::{Deserialize, Serialize};

use super::{ListStore, StoreScope};
use crate::application::ports::{KeyValueStore, StoreKind};
use crate::domain::position::PositionRecord;
use crate::domain::security::SecurityIdentity;
use crate::domain::shared::Side;
use crate::error::{PersistenceError, TooManyMatches};

/// One stored virtual position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualEntry {
    /// Security the position lives on.
    pub security: SecurityIdentity,
    /// Persisted position.
    pub record: PositionRecord,
}

impl VirtualEntry {
    /// Pair a security with a record.
    #[must_use]
    pub const fn new(security: SecurityIdentity, record: PositionRecord) -> Self {
        Self { security, record }
    }
}

/// Index of the single entry for `security`, if any.
///
/// # Errors
///
/// `TooManyMatches` when the list holds more than one entry for `security`.
pub fn single_or_default(
    entries: &[VirtualEntry],
    security: &SecurityIdentity,
    side: Side,
) -> Result<Option<usize>, TooManyMatches> {
    let mut matches = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| &e.security == security)
        .map(|(i, _)| i);
    let first = matches.next();
    let extra = matches.count();
    if extra > 0 {
        return Err(TooManyMatches {
            security: security.clone(),
            side,
            count: extra + 1,
        });
    }
    Ok(first)
}

/// Long and short virtual-position lists of one manager.
pub struct VirtualPositionStore<'a> {
    long: ListStore<'a, VirtualEntry>,
    short: ListStore<'a, VirtualEntry>,
}

impl<'a> VirtualPositionStore<'a> {
    /// Stores of `scope` in `store`.
    #[must_use]
    pub fn new(store: &'a dyn KeyValueStore, scope: &StoreScope) -> Self {
        Self {
            long: ListStore::new(store, scope.key(StoreKind::LongPositions)),
            short: ListStore::new(store, scope.key(StoreKind::ShortPositions)),
        }
    }

    /// List for one side.
    #[must_use]
    pub const fn list(&self, side: Side) -> &ListStore<'a, VirtualEntry> {
        match side {
            Side::Long => &self.long,
            Side::Short => &self.short,
        }
    }

    /// Entries of one side.
    ///
    /// # Errors
    ///
    /// Decode failure.
    pub fn load(&self, side: Side) -> Result<Vec<VirtualEntry>, PersistenceError> {
        self.list(side).load()
    }

    /// The single entry of `side` for `security`.
    ///
    /// # Errors
    ///
    /// Decode failure, or `Ok(Err(TooManyMatches))` for duplicates.
    pub fn find(
        &self,
        side: Side,
        security: &SecurityIdentity,
    ) -> Result<Result<Option<VirtualEntry>, TooManyMatches>, PersistenceError> {
        let entries = self.load(side)?;
        Ok(single_or_default(&entries, security, side).map(|idx| idx.map(|i| entries[i].clone())))
    }

    /// Append an entry to its side's list.
    ///
    /// # Errors
    ///
    /// Decode or encode failure.
    pub fn push(&self, entry: VirtualEntry) -> Result<(), PersistenceError> {
        self.list(entry.record.side).update(|items| items.push(entry))
    }

    /// Replace the entry for `entry.security` in place, or append it.
    ///
    /// # Errors
    ///
    /// Decode or encode failure.
    pub fn upsert(&self, entry: VirtualEntry) -> Result<(), PersistenceError> {
        self.list(entry.record.side).update(|items| {
            match items.iter_mut().find(|e| e.security == entry.security) {
                Some(existing) => *existing = entry,
                None => items.push(entry),
            }
        })
    }

    /// Remove every entry of `side` for `security`. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Decode or encode failure.
    pub fn remove(&self, side: Side, security: &SecurityIdentity) -> Result<usize, PersistenceError> {
        self.list(side).update(|items| {
            let before = items.len();
            items.retain(|e| &e.security != security);
            before - items.len()
        })
    }

    /// Drop both lists. Returns `(long, short)` counts removed.
    ///
    /// # Errors
    ///
    /// Decode failure.
    pub fn clear(&self) -> Result<(usize, usize), PersistenceError> {
        Ok((self.long.clear()?, self.short.clear()?))
    }
}
