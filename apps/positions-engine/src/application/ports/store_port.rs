//! Key/Value Store Port (Driven Port)
//!
//! Typed cache keys replace ad hoc string concatenation. The owner carries
//! the scope: a local key belongs to one strategy instance, a global key is
//! shared by every instance trading under the same trade name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cache scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheScope {
    /// Per strategy instance.
    Local,
    /// Shared across instances of one trade name.
    Global,
}

/// Owner of a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheOwner {
    /// Keyed by strategy instance id.
    Instance(String),
    /// Keyed by trade name.
    TradeName(String),
}

impl CacheOwner {
    /// Scope implied by the owner.
    #[must_use]
    pub const fn scope(&self) -> CacheScope {
        match self {
            Self::Instance(_) => CacheScope::Local,
            Self::TradeName(_) => CacheScope::Global,
        }
    }
}

/// Which persisted list an entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Long virtual positions.
    LongPositions,
    /// Short virtual positions.
    ShortPositions,
    /// Long volatility intents.
    LongIntents,
    /// Short volatility intents.
    ShortIntents,
    /// Queued fixed-price orders.
    PendingOrders,
}

/// Manager discriminator, so the option-series and single-security managers
/// never read each other's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerKind {
    /// Manager over a whole option series.
    #[default]
    #[serde(alias = "series")]
    OptionSeries,
    /// Manager over one security.
    SingleSecurity,
}

/// Fully typed cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Entry owner (and therefore scope).
    pub owner: CacheOwner,
    /// Manager discriminator.
    pub manager: ManagerKind,
    /// Persisted list.
    pub kind: StoreKind,
}

impl CacheKey {
    /// Build a key.
    #[must_use]
    pub const fn new(owner: CacheOwner, manager: ManagerKind, kind: StoreKind) -> Self {
        Self {
            owner,
            manager,
            kind,
        }
    }

    /// Scope of the key.
    #[must_use]
    pub const fn scope(&self) -> CacheScope {
        self.owner.scope()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (scope, owner) = match &self.owner {
            CacheOwner::Instance(id) => ("local", id),
            CacheOwner::TradeName(name) => ("global", name),
        };
        write!(f, "positions/{:?}/{:?}/{scope}:{owner}", self.manager, self.kind)
    }
}

/// Value that the cache must never evict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pinned<T>(T);

impl<T> Pinned<T> {
    /// Pin a value.
    pub const fn new(value: T) -> Self {
        Self(value)
    }

    /// Borrow the value.
    pub const fn get(&self) -> &T {
        &self.0
    }

    /// Unwrap the value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

/// Host key/value cache. Values are opaque serialized blobs.
pub trait KeyValueStore {
    /// Load a blob.
    fn load(&self, key: &CacheKey) -> Option<Vec<u8>>;

    /// Store a blob that survives eviction.
    fn store_pinned(&self, key: &CacheKey, value: Pinned<Vec<u8>>);

    /// Remove an entry. Returns true if it existed.
    fn remove(&self, key: &CacheKey) -> bool;
}
