//! In-memory key/value cache with pinned entries.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::application::ports::{CacheKey, KeyValueStore, Pinned};

#[derive(Debug, Clone)]
struct Entry {
    bytes: Vec<u8>,
    pinned: bool,
}

/// In-memory implementation of `KeyValueStore`.
///
/// Entries written through `store_pinned` survive [`InMemoryCache::evict`];
/// transient entries (written with [`InMemoryCache::store_transient`]) do not.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<CacheKey, Entry>>,
}

impl InMemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True if the cache holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Store an entry that eviction may drop.
    pub fn store_transient(&self, key: &CacheKey, bytes: Vec<u8>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), Entry { bytes, pinned: false });
    }

    /// Drop every entry that is not pinned. Returns how many were dropped.
    pub fn evict(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| entry.pinned);
        before - entries.len()
    }
}

impl KeyValueStore for InMemoryCache {
    fn load(&self, key: &CacheKey) -> Option<Vec<u8>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|entry| entry.bytes.clone())
    }

    fn store_pinned(&self, key: &CacheKey, value: Pinned<Vec<u8>>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                key.clone(),
                Entry {
                    bytes: value.into_inner(),
                    pinned: true,
                },
            );
    }

    fn remove(&self, key: &CacheKey) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }
}
