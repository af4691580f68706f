//! Cache Module
//!
//! Provides the in-memory read-through cache with TTL expiration and LRU
//! eviction.

mod entry;
mod inflight;
mod loading;
mod lru;
mod state;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use inflight::{Flight, InflightLoads};
pub use loading::Cache;
pub use lru::{RecencyToken, RecencyTracker};
pub use state::{CacheState, Lookup};
pub use store::Store;
