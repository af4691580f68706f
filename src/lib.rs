//! Loading Cache - A bounded in-process read-through cache
//!
//! Provides per-entry TTL expiration, LRU eviction under a fixed capacity,
//! and population on miss through a caller-supplied [`Loader`].
//!
//! ```ignore
//! let cache = Cache::new(CacheConfig::default(), |id: u64| async move {
//!     anyhow::Ok(Some(format!("user-{}", id)))
//! })?;
//!
//! let name = cache.get(&7).await?;
//! cache.close().await;
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod loader;
pub mod tasks;

pub use cache::Cache;
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use loader::{blocking, BlockingLoader, Loader};
