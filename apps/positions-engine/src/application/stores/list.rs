//! Generic JSON list stored under one cache key.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

use crate::application::ports::{CacheKey, KeyValueStore, Pinned};
use crate::error::PersistenceError;

/// A typed list persisted as one pinned blob.
pub struct ListStore<'a, T> {
    store: &'a dyn KeyValueStore,
    key: CacheKey,
    _marker: PhantomData<T>,
}

impl<'a, T> ListStore<'a, T>
where
    T: Serialize + DeserializeOwned,
{
    /// List under `key`.
    #[must_use]
    pub fn new(store: &'a dyn KeyValueStore, key: CacheKey) -> Self {
        Self {
            store,
            key,
            _marker: PhantomData,
        }
    }

    /// Read the whole list. A missing entry is an empty list.
    ///
    /// # Errors
    ///
    /// `Decode` if the stored blob is not a list of `T`.
    pub fn load(&self) -> Result<Vec<T>, PersistenceError> {
        match self.store.load(&self.key) {
            Some(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| PersistenceError::decode(&self.key, &e))
            }
            None => Ok(Vec::new()),
        }
    }

    /// Replace the whole list. An empty list removes the entry.
    ///
    /// # Errors
    ///
    /// `Encode` if serialization fails.
    pub fn save(&self, items: &[T]) -> Result<(), PersistenceError> {
        if items.is_empty() {
            self.store.remove(&self.key);
            return Ok(());
        }
        let bytes = serde_json::to_vec(items).map_err(|e| PersistenceError::encode(&self.key, &e))?;
        self.store.store_pinned(&self.key, Pinned::new(bytes));
        Ok(())
    }

    /// Read, mutate and write back the whole list.
    ///
    /// # Errors
    ///
    /// Decode or encode failures. Nothing is written if decoding fails.
    pub fn update<R>(&self, mutate: impl FnOnce(&mut Vec<T>) -> R) -> Result<R, PersistenceError> {
        let mut items = self.load()?;
        let result = mutate(&mut items);
        self.save(&items)?;
        Ok(result)
    }

    /// Remove every item, returning how many there were.
    ///
    /// # Errors
    ///
    /// Decode failure of the current content.
    pub fn clear(&self) -> Result<usize, PersistenceError> {
        let count = self.load()?.len();
        self.store.remove(&self.key);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{CacheOwner, ManagerKind, StoreKind};
    use crate::infrastructure::cache::InMemoryCache;

    fn key() -> CacheKey {
        CacheKey::new(
            CacheOwner::Instance("t".to_string()),
            ManagerKind::OptionSeries,
            StoreKind::PendingOrders,
        )
    }

    #[test]
    fn missing_entry_is_empty() {
        let cache = InMemoryCache::new();
        let list: ListStore<'_, u32> = ListStore::new(&cache, key());
        assert!(list.load().unwrap().is_empty());
    }

    #[test]
    fn update_rewrites_whole_list() {
        let cache = InMemoryCache::new();
        let list: ListStore<'_, u32> = ListStore::new(&cache, key());
        list.save(&[1, 2]).unwrap();
        let len = list.update(|items| {
            items.push(3);
            items.len()
        })
        .unwrap();
        assert_eq!(len, 3);
        assert_eq!(list.load().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn empty_save_removes_entry() {
        let cache = InMemoryCache::new();
        let list: ListStore<'_, u32> = ListStore::new(&cache, key());
        list.save(&[1]).unwrap();
        list.save(&[]).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn corrupt_blob_is_a_decode_error_and_is_kept() {
        let cache = InMemoryCache::new();
        cache.store_pinned(&key(), Pinned::new(b"not json".to_vec()));
        let list: ListStore<'_, u32> = ListStore::new(&cache, key());
        assert!(matches!(list.load(), Err(PersistenceError::Decode { .. })));
        assert!(list.update(|items| items.push(1)).is_err());
        assert_eq!(cache.load(&key()), Some(b"not json".to_vec()));
    }

    #[test]
    fn clear_reports_previous_count() {
        let cache = InMemoryCache::new();
        let list: ListStore<'_, u32> = ListStore::new(&cache, key());
        list.save(&[4, 5, 6]).unwrap();
        assert_eq!(list.clear().unwrap(), 3);
        assert_eq!(list.clear().unwrap(), 0);
    }
}
