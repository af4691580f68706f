//! TTL Sweeper Task
//!
//! Background task that periodically removes expired cache entries,
//! independent of foreground traffic.

use std::hash::Hash;
use std::sync::Weak;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cache::CacheState;

/// Candidates removed per lock acquisition.
pub const SWEEP_BATCH: usize = 64;

/// Longest the sweeper waits for the state lock before deferring work to the
/// next tick.
pub const SWEEP_LOCK_WAIT: Duration = Duration::from_millis(10);

/// What one sweep pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Entries removed
    pub removed: usize,
    /// Expired candidates left for the next tick because the lock was busy
    pub deferred: usize,
    /// The lock could not be taken for the snapshot; nothing was scanned
    pub skipped: bool,
}

/// Runs one sweep pass over `state`.
///
/// Expired keys are snapshotted first, then removed in batches with a
/// compare-and-remove that re-checks each deadline against the clock at
/// removal time, so an entry refreshed after the snapshot survives.
pub fn sweep_expired<K, V>(state: &Mutex<CacheState<K, V>>) -> SweepOutcome
where
    K: Hash + Eq + Clone,
{
    match expired_candidates(state) {
        Some(candidates) => remove_candidates(state, &candidates),
        None => SweepOutcome {
            skipped: true,
            ..SweepOutcome::default()
        },
    }
}

/// Snapshots the keys expired right now, or `None` if the lock stayed busy.
pub fn expired_candidates<K, V>(state: &Mutex<CacheState<K, V>>) -> Option<Vec<K>>
where
    K: Hash + Eq + Clone,
{
    state
        .try_lock_for(SWEEP_LOCK_WAIT)
        .map(|guard| guard.expired_keys(Instant::now()))
}

/// Removes `candidates` that are still expired, one batch per lock
/// acquisition.
///
/// When a batch cannot get the lock in time, it and every later batch are
/// counted as deferred and left for the next pass.
pub fn remove_candidates<K, V>(state: &Mutex<CacheState<K, V>>, candidates: &[K]) -> SweepOutcome
where
    K: Hash + Eq + Clone,
{
    let mut outcome = SweepOutcome::default();
    let mut processed = 0;

    for batch in candidates.chunks(SWEEP_BATCH) {
        let Some(mut guard) = state.try_lock_for(SWEEP_LOCK_WAIT) else {
            outcome.deferred = candidates.len() - processed;
            break;
        };

        let now = Instant::now();
        for key in batch {
            if guard.remove_if_expired(key, now) {
                outcome.removed += 1;
            }
        }
        processed += batch.len();
    }

    outcome
}

// == Sweeper ==
/// Handle to the running sweeper task.
///
/// Dropping the handle also stops the task: the shutdown channel closes and
/// the loop exits on its next wake-up.
#[derive(Debug)]
pub struct Sweeper {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Spawns the sweeper on `runtime`, running every `interval`.
    ///
    /// The first pass runs one interval after start. The task only holds a
    /// weak reference to the state and exits once the cache is gone.
    pub fn spawn<K, V>(
        runtime: &Handle,
        state: Weak<Mutex<CacheState<K, V>>>,
        interval: Duration,
    ) -> Self
    where
        K: Hash + Eq + Clone + Send + 'static,
        V: Send + 'static,
    {
        let (shutdown, mut shutdown_rx) = oneshot::channel();

        let handle = runtime.spawn(async move {
            info!(
                interval_ms = interval.as_millis() as u64,
                "Starting TTL sweeper"
            );

            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {}
                }

                let Some(shared) = state.upgrade() else {
                    break;
                };
                let outcome = sweep_expired(&shared);
                drop(shared);

                if outcome.skipped {
                    debug!("TTL sweep: state busy, retrying next tick");
                } else if outcome.removed > 0 {
                    info!("TTL sweep: removed {} expired entries", outcome.removed);
                } else {
                    debug!("TTL sweep: no expired entries found");
                }
                if outcome.deferred > 0 {
                    debug!(
                        "TTL sweep: deferred {} expired entries to next tick",
                        outcome.deferred
                    );
                }
            }

            info!("TTL sweeper stopped");
        });

        Self { shutdown, handle }
    }

    /// Signals the task to stop and waits for it to finish.
    ///
    /// A pass already running completes; no further pass is scheduled.
    pub async fn stop(self) {
        let Self { shutdown, handle } = self;
        // The task may already have exited on its own
        let _ = shutdown.send(());
        if let Err(err) = handle.await {
            warn!("TTL sweeper terminated abnormally: {}", err);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
