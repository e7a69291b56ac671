//! Persisted stores.
//!
//! Every store reads a full list from the cache, mutates it in memory and
//! writes the full list back. There is no partial update primitive, and no
//! locking: the host guarantees one evaluation step at a time per trade name.

mod iv_targets;
mod list;
mod pending_orders;
mod virtual_positions;

pub use iv_targets::IvTargetStore;
pub use list::ListStore;
pub use pending_orders::PendingOrderStore;
pub use virtual_positions::{VirtualEntry, VirtualPositionStore, single_or_default};

use crate::application::ports::{CacheOwner, CacheKey, ManagerKind, StoreKind};

/// Owner and discriminator shared by all keys of one manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreScope {
    owner: CacheOwner,
    manager: ManagerKind,
}

impl StoreScope {
    /// Scope for `owner` and `manager`.
    #[must_use]
    pub const fn new(owner: CacheOwner, manager: ManagerKind) -> Self {
        Self { owner, manager }
    }

    /// Key of the list `kind` in this scope.
    #[must_use]
    pub fn key(&self, kind: StoreKind) -> CacheKey {
        CacheKey::new(self.owner.clone(), self.manager, kind)
    }
}
