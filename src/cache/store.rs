//! Cache Store Module
//!
//! Authoritative key to entry mapping.

use std::collections::HashMap;
use std::hash::Hash;

use crate::cache::CacheEntry;

// == Cache Store ==
/// Key to entry storage.
///
/// The store is only reachable through the cache state lock, which makes
/// every per-key operation atomic.
#[derive(Debug)]
pub struct Store<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
}

impl<K, V> Default for Store<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K, V> Store<K, V>
where
    K: Hash + Eq,
{
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    // == Get ==
    pub fn get(&self, key: &K) -> Option<&CacheEntry<V>> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut CacheEntry<V>> {
        self.entries.get_mut(key)
    }

    // == Insert ==
    /// Inserts or replaces the entry for `key`, returning the previous one.
    pub fn insert(&mut self, key: K, entry: CacheEntry<V>) -> Option<CacheEntry<V>> {
        self.entries.insert(key, entry)
    }

    // == Remove ==
    /// Removes the entry for `key`, if present.
    pub fn remove(&mut self, key: &K) -> Option<CacheEntry<V>> {
        self.entries.remove(key)
    }

    /// Compare-and-remove: removes the entry only if `predicate` holds for
    /// its current state.
    pub fn remove_if<F>(&mut self, key: &K, predicate: F) -> Option<CacheEntry<V>>
    where
        F: FnOnce(&CacheEntry<V>) -> bool,
    {
        if self.entries.get(key).is_some_and(predicate) {
            self.entries.remove(key)
        } else {
            None
        }
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a snapshot of the current keys.
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.entries.keys().cloned().collect()
    }

    #[cfg(test)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&K, &CacheEntry<V>)> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
