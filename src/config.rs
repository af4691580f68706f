//! Configuration Module
//!
//! Construction parameters for the cache, loadable from environment variables.

use std::env;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Cache construction parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold
    pub max_size: usize,
    /// TTL applied when a put or load does not specify one
    pub default_ttl: Duration,
    /// Period of the background sweep removing expired entries
    pub sweep_interval: Duration,
    /// Serialize concurrent misses for the same key through a single load
    pub coalesce_loads: bool,
}

impl CacheConfig {
    /// Creates a new config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_SIZE` - Maximum cache entries (default: 1000)
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `CACHE_SWEEP_INTERVAL_MS` - Sweep period in milliseconds (default: 1000)
    /// - `CACHE_COALESCE_LOADS` - `true` to coalesce concurrent loads (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_size: parse_var("CACHE_MAX_SIZE").unwrap_or(defaults.max_size),
            default_ttl: parse_var("CACHE_DEFAULT_TTL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.default_ttl),
            sweep_interval: parse_var("CACHE_SWEEP_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.sweep_interval),
            coalesce_loads: parse_var("CACHE_COALESCE_LOADS").unwrap_or(defaults.coalesce_loads),
        }
    }

    /// Rejects a zero capacity, TTL or sweep interval.
    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(CacheError::InvalidConfiguration(
                "max_size must be positive".to_string(),
            ));
        }
        if self.default_ttl.is_zero() {
            return Err(CacheError::InvalidConfiguration(
                "default_ttl must be positive".to_string(),
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(CacheError::InvalidConfiguration(
                "sweep_interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            default_ttl: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(1),
            coalesce_loads: false,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
