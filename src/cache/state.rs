//! Cache State Module
//!
//! Couples the store and the recency tracker so that value, deadline and
//! recency of a key always change together.

use std::hash::Hash;
use std::time::Duration;

use tokio::time::Instant;

use crate::cache::{CacheEntry, RecencyTracker, Store};

/// Result of a foreground lookup.
#[derive(Debug, PartialEq, Eq)]
pub enum Lookup<V> {
    /// Live entry; it has been marked most recently used
    Hit(V),
    /// The entry had expired and was dropped
    Expired,
    /// No entry for the key
    Miss,
}

// == Cache State ==
/// Store and recency tracker guarded by a single lock.
///
/// Invariants, holding whenever the lock is released:
/// - the tracker holds exactly the keys of the store
/// - `len() <= max_size`
#[derive(Debug)]
pub struct CacheState<K, V> {
    store: Store<K, V>,
    recency: RecencyTracker<K>,
    max_size: usize,
}

impl<K, V> CacheState<K, V>
where
    K: Hash + Eq + Clone,
{
    // == Constructor ==
    /// Creates an empty state bounded to `max_size` entries.
    pub fn new(max_size: usize) -> Self {
        Self {
            store: Store::with_capacity(max_size.min(1024)),
            recency: RecencyTracker::with_capacity(max_size.min(1024)),
            max_size,
        }
    }

    // == Lookup ==
    /// Looks up a key at `now`.
    ///
    /// A live entry is touched and its value cloned; its deadline is left
    /// alone. An expired entry is removed from both structures.
    pub fn lookup(&mut self, key: &K, now: Instant) -> Lookup<V>
    where
        V: Clone,
    {
        let expired = match self.store.get(key) {
            Some(entry) => entry.is_expired_at(now),
            None => return Lookup::Miss,
        };

        if expired {
            self.remove(key);
            return Lookup::Expired;
        }

        match self.store.get(key) {
            Some(entry) => {
                self.recency.touch(entry.recency);
                Lookup::Hit(entry.value.clone())
            }
            None => Lookup::Miss,
        }
    }

    // == Insert ==
    /// Upserts `key` with a fresh deadline and marks it most recently used.
    ///
    /// Inserting a new key into a full state first evicts the least recently
    /// used entry, whose key is returned.
    pub fn insert(&mut self, key: K, value: V, ttl: Duration, now: Instant) -> Option<K> {
        if let Some(entry) = self.store.get_mut(&key) {
            let token = entry.recency;
            *entry = CacheEntry::new(value, ttl, now, token);
            self.recency.touch(token);
            return None;
        }

        let evicted = if self.store.len() >= self.max_size {
            let Some(victim) = self.recency.evict_victim() else {
                panic!(
                    "recency tracker is empty while the store holds {} entries",
                    self.store.len()
                );
            };
            self.store.remove(&victim);
            Some(victim)
        } else {
            None
        };

        let token = self.recency.push(key.clone());
        self.store.insert(key, CacheEntry::new(value, ttl, now, token));
        evicted
    }

    // == Remove ==
    /// Removes `key` from both structures, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let entry = self.store.remove(key)?;
        self.recency.remove(entry.recency);
        Some(entry.value)
    }

    // == Sweep Support ==
    /// Snapshots the keys whose entries are expired at `now`.
    pub fn expired_keys(&self, now: Instant) -> Vec<K> {
        let mut keys = self.store.keys();
        keys.retain(|key| {
            self.store
                .get(key)
                .is_some_and(|entry| entry.is_expired_at(now))
        });
        keys
    }

    /// Compare-and-remove: drops `key` only if its entry is still expired at
    /// `now`. An entry refreshed since the snapshot survives.
    pub fn remove_if_expired(&mut self, key: &K, now: Instant) -> bool {
        match self.store.remove_if(key, |entry| entry.is_expired_at(now)) {
            Some(entry) => {
                self.recency.remove(entry.recency);
                true
            }
            None => false,
        }
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.store.clear();
        self.recency.clear();
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Returns `(key, value, deadline)` from least to most recently used.
    #[cfg(test)]
    pub(crate) fn entries_by_recency(&self) -> Vec<(K, V, Instant)>
    where
        V: Clone,
    {
        self.recency
            .iter()
            .filter_map(|key| {
                self.store
                    .get(key)
                    .map(|entry| (key.clone(), entry.value.clone(), entry.expires_at))
            })
            .collect()
    }

    /// Checks that store and tracker describe the same key set.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        self.store.len() == self.recency.len()
            && self.store.len() <= self.max_size
            && self
                .store
                .iter()
                .all(|(key, entry)| self.recency.key(entry.recency) == Some(key))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(300);

    fn keys(state: &CacheState<&'static str, i32>) -> Vec<&'static str> {
        state
            .entries_by_recency()
            .into_iter()
            .map(|(k, _, _)| k)
            .collect()
    }

    #[test]
    fn test_state_insert_and_lookup() {
        let now = Instant::now();
        let mut state = CacheState::new(10);

        assert_eq!(state.insert("a", 1, TTL, now), None);

        assert_eq!(state.lookup(&"a", now), Lookup::Hit(1));
        assert_eq!(state.lookup(&"b", now), Lookup::Miss);
        assert!(state.is_consistent());
    }

    #[test]
    fn test_state_lookup_does_not_refresh_deadline() {
        let now = Instant::now();
        let mut state = CacheState::new(10);

        state.insert("a", 1, Duration::from_millis(100), now);
        assert_eq!(
            state.lookup(&"a", now + Duration::from_millis(60)),
            Lookup::Hit(1)
        );

        let (_, _, deadline) = state.entries_by_recency()[0];
        assert_eq!(deadline, now + Duration::from_millis(100));
    }

    #[test]
    fn test_state_lookup_drops_expired_entry() {
        let now = Instant::now();
        let mut state = CacheState::new(10);

        state.insert("a", 1, Duration::from_millis(100), now);

        assert_eq!(
            state.lookup(&"a", now + Duration::from_millis(100)),
            Lookup::Expired
        );
        assert!(state.is_empty());
        assert!(state.is_consistent());
    }

    #[test]
    fn test_state_evicts_least_recently_used() {
        let now = Instant::now();
        let mut state = CacheState::new(2);

        state.insert("a", 1, TTL, now);
        state.insert("b", 2, TTL, now);
        assert_eq!(state.lookup(&"a", now), Lookup::Hit(1));

        assert_eq!(state.insert("c", 3, TTL, now), Some("b"));
        assert_eq!(keys(&state), vec!["a", "c"]);
        assert!(state.is_consistent());
    }

    #[test]
    fn test_state_overwrite_at_capacity_does_not_evict() {
        let now = Instant::now();
        let mut state = CacheState::new(2);

        state.insert("a", 1, TTL, now);
        state.insert("b", 2, TTL, now);

        assert_eq!(state.insert("a", 10, TTL, now), None);
        assert_eq!(state.len(), 2);
        assert_eq!(keys(&state), vec!["b", "a"]);
        assert_eq!(state.lookup(&"a", now), Lookup::Hit(10));
    }

    #[test]
    fn test_state_overwrite_refreshes_deadline() {
        let now = Instant::now();
        let later = now + Duration::from_millis(80);
        let mut state = CacheState::new(2);

        state.insert("a", 1, Duration::from_millis(100), now);
        state.insert("a", 2, Duration::from_millis(100), later);

        assert_eq!(
            state.lookup(&"a", now + Duration::from_millis(150)),
            Lookup::Hit(2)
        );
    }

    #[test]
    fn test_state_remove() {
        let now = Instant::now();
        let mut state = CacheState::new(4);

        state.insert("a", 1, TTL, now);

        assert_eq!(state.remove(&"a"), Some(1));
        assert_eq!(state.remove(&"a"), None);
        assert!(state.is_empty());
        assert!(state.is_consistent());
    }

    #[test]
    fn test_state_compare_and_remove_spares_refreshed_entry() {
        let now = Instant::now();
        let mut state = CacheState::new(4);

        state.insert("a", 1, Duration::from_millis(100), now);
        state.insert("b", 2, Duration::from_millis(100), now);

        let sweep_time = now + Duration::from_millis(150);
        let mut candidates = state.expired_keys(sweep_time);
        candidates.sort();
        assert_eq!(candidates, vec!["a", "b"]);

        // A put lands between the snapshot and the removal
        state.insert("a", 10, Duration::from_millis(100), sweep_time);

        let removed: Vec<_> = candidates
            .iter()
            .filter(|key| state.remove_if_expired(key, sweep_time))
            .collect();

        assert_eq!(removed, vec![&"b"]);
        assert_eq!(state.lookup(&"a", sweep_time), Lookup::Hit(10));
        assert!(state.is_consistent());
    }

    #[test]
    fn test_state_clear() {
        let now = Instant::now();
        let mut state = CacheState::new(8);

        for (i, key) in ["a", "b", "c", "d", "e"].into_iter().enumerate() {
            state.insert(key, i as i32, TTL, now);
        }
        state.clear();

        assert_eq!(state.len(), 0);
        assert_eq!(state.lookup(&"a", now), Lookup::Miss);
        assert!(state.is_consistent());
    }
}
