//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a cache is alive.
//!
//! # Tasks
//! - TTL Sweeper: Removes expired cache entries at the configured interval

mod sweeper;

pub use sweeper::{
    expired_candidates, remove_candidates, sweep_expired, SweepOutcome, Sweeper, SWEEP_BATCH,
    SWEEP_LOCK_WAIT,
};
