//! Loading Cache Module
//!
//! The read-through cache façade: lookups, writes, invalidation and the
//! lifecycle of the background sweeper.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::cache::{CacheState, InflightLoads, Lookup};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::loader::Loader;
use crate::tasks::Sweeper;

// == Cache ==
/// Bounded read-through cache with per-entry TTL and LRU eviction.
///
/// Cloning is cheap and every clone shares the same entries. Values are
/// handed out as clones; wrap large values in `Arc`.
///
/// # Concurrent misses
///
/// With `coalesce_loads` disabled, concurrent misses for one key each call
/// the loader. With it enabled, they queue on a per-key gate: one caller
/// loads and the others read the result, or load in turn if it failed.
///
/// # Clock
///
/// Deadlines use tokio's monotonic [`Instant`]. If the underlying clock
/// misbehaves, entries may expire early or late; this is never reported as
/// an error.
pub struct Cache<K, V, L> {
    inner: Arc<Inner<K, V, L>>,
}

struct Inner<K, V, L> {
    state: Arc<Mutex<CacheState<K, V>>>,
    loader: L,
    config: CacheConfig,
    inflight: Option<InflightLoads<K>>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl<K, V, L> Clone for Cache<K, V, L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V, L> Cache<K, V, L>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    L: Loader<K, V>,
{
    // == Constructor ==
    /// Creates a cache and starts its sweeper on the current tokio runtime.
    ///
    /// # Errors
    /// - `InvalidConfiguration` if the config fails validation
    /// - `RuntimeUnavailable` if called outside a tokio runtime
    pub fn new(config: CacheConfig, loader: L) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| CacheError::RuntimeUnavailable)?;

        let state = Arc::new(Mutex::new(CacheState::new(config.max_size)));
        let sweeper = Sweeper::spawn(&runtime, Arc::downgrade(&state), config.sweep_interval);

        info!(
            "Cache initialized: max_size={}, default_ttl={:?}, sweep_interval={:?}, coalesce_loads={}",
            config.max_size, config.default_ttl, config.sweep_interval, config.coalesce_loads
        );

        Ok(Self {
            inner: Arc::new(Inner {
                state,
                loader,
                inflight: config.coalesce_loads.then(InflightLoads::new),
                config,
                sweeper: Mutex::new(Some(sweeper)),
            }),
        })
    }

    // == Get ==
    /// Returns the cached value for `key`, loading it on a miss.
    ///
    /// A loaded value is cached with the default TTL.
    ///
    /// # Errors
    /// - `LoadFailed` if the loader failed; nothing is cached
    /// - `NotFound` if the loader has no value; nothing is cached
    pub async fn get(&self, key: &K) -> Result<V> {
        self.get_or_load(key, None).await
    }

    /// Like [`get`](Self::get), caching a loaded value with `ttl` instead of
    /// the default. A hit keeps the entry's current deadline.
    pub async fn get_with_ttl(&self, key: &K, ttl: Duration) -> Result<V> {
        self.get_or_load(key, Some(ttl)).await
    }

    async fn get_or_load(&self, key: &K, ttl: Option<Duration>) -> Result<V> {
        if let Some(value) = self.lookup(key) {
            return Ok(value);
        }

        match &self.inner.inflight {
            None => self.load(key, ttl).await,
            Some(inflight) => {
                let flight = inflight.join(key);
                let _permit = flight.acquire().await;
                // Filled by the caller that held the gate before us
                if let Some(value) = self.lookup(key) {
                    return Ok(value);
                }
                self.load(key, ttl).await
            }
        }
    }

    fn lookup(&self, key: &K) -> Option<V> {
        let lookup = self.inner.state.lock().lookup(key, Instant::now());
        match lookup {
            Lookup::Hit(value) => Some(value),
            Lookup::Expired => {
                debug!("Dropped expired entry on lookup");
                None
            }
            Lookup::Miss => None,
        }
    }

    async fn load(&self, key: &K, ttl: Option<Duration>) -> Result<V> {
        let loaded = self.inner.loader.load(key).await.map_err(|source| {
            debug!("Loader failed: {:#}", source);
            CacheError::load_failed(source)
        })?;
        let value = loaded.ok_or(CacheError::NotFound)?;

        self.put_with_ttl(
            key.clone(),
            value.clone(),
            ttl.unwrap_or(self.inner.config.default_ttl),
        );
        Ok(value)
    }

    // == Put ==
    /// Stores a value with the default TTL.
    pub fn put(&self, key: K, value: V) {
        self.put_with_ttl(key, value, self.inner.config.default_ttl);
    }

    /// Stores a value expiring after `ttl`.
    ///
    /// Overwriting resets the deadline and marks the key most recently used.
    /// A new key inserted at capacity evicts the least recently used entry
    /// first. A zero `ttl` stores an entry that is already expired.
    pub fn put_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let evicted = self
            .inner
            .state
            .lock()
            .insert(key, value, ttl, Instant::now());
        if evicted.is_some() {
            debug!("Evicted least recently used entry");
        }
    }

    // == Invalidate ==
    /// Removes `key`. Returns whether an entry was present.
    pub fn invalidate(&self, key: &K) -> bool {
        self.inner.state.lock().remove(key).is_some()
    }

    /// Removes every entry.
    pub fn invalidate_all(&self) {
        self.inner.state.lock().clear();
    }

    // == Length ==
    /// Number of entries held, including expired ones not yet dropped.
    pub fn len(&self) -> usize {
        self.inner.state.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    // == Close ==
    /// Stops the sweeper, waits for it to finish and drops every entry.
    ///
    /// Calling `close` again is a no-op apart from clearing the entries.
    pub async fn close(&self) {
        let sweeper = self.inner.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            sweeper.stop().await;
            info!("Cache closed");
        }
        self.invalidate_all();
    }
}
