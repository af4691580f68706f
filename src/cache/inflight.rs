//! Inflight Loads Module
//!
//! Per-key gates that serialize concurrent misses so one caller loads while
//! the others wait and then read the populated entry.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Gate = Arc<AsyncMutex<()>>;

#[derive(Debug)]
struct GateSlot {
    gate: Gate,
    /// Flights registered on `gate`, only changed under the registry lock
    flights: usize,
}

/// Registry of per-key load gates.
#[derive(Debug)]
pub struct InflightLoads<K> {
    gates: Mutex<HashMap<K, GateSlot>>,
}

impl<K> Default for InflightLoads<K> {
    fn default() -> Self {
        Self {
            gates: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> InflightLoads<K>
where
    K: Hash + Eq + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers interest in loading `key`.
    ///
    /// The returned flight unregisters itself on drop, including when the
    /// owning future is cancelled while waiting.
    pub fn join(&self, key: &K) -> Flight<'_, K> {
        let mut gates = self.gates.lock();
        let slot = gates.entry(key.clone()).or_insert_with(|| GateSlot {
            gate: Arc::new(AsyncMutex::new(())),
            flights: 0,
        });
        slot.flights += 1;
        let gate = Arc::clone(&slot.gate);
        drop(gates);

        Flight {
            loads: self,
            key: key.clone(),
            gate,
        }
    }

    /// Number of keys with at least one registered flight.
    pub fn len(&self) -> usize {
        self.gates.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One caller's registration on a key's gate.
pub struct Flight<'a, K>
where
    K: Hash + Eq,
{
    loads: &'a InflightLoads<K>,
    key: K,
    gate: Gate,
}

impl<K> Flight<'_, K>
where
    K: Hash + Eq,
{
    /// Waits for exclusive use of the key's gate.
    ///
    /// The permit must be dropped before the flight.
    pub async fn acquire(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.gate).lock_owned().await
    }
}

impl<K> Drop for Flight<'_, K>
where
    K: Hash + Eq,
{
    fn drop(&mut self) {
        let mut gates = self.loads.gates.lock();
        if let Some(slot) = gates.get_mut(&self.key) {
            slot.flights -= 1;
            if slot.flights == 0 {
                gates.remove(&self.key);
            }
        }
    }
}
