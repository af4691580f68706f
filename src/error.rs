//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The loader failed for the requested key. Never cached, never retried.
    #[error("Load failed: {source}")]
    LoadFailed {
        #[source]
        source: anyhow::Error,
    },

    /// The loader completed but has no value for the requested key
    #[error("Key not found")]
    NotFound,

    /// Rejected construction parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The sweeper could not be scheduled because no tokio runtime is running
    #[error("No tokio runtime available to schedule the sweeper")]
    RuntimeUnavailable,
}

impl CacheError {
    /// Wraps a loader failure.
    pub fn load_failed(source: impl Into<anyhow::Error>) -> Self {
        CacheError::LoadFailed {
            source: source.into(),
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
