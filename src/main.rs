//! Loading Cache - demo workload
//!
//! Runs concurrent readers against a cache backed by a slow, blocking source
//! until interrupted or until `DEMO_DURATION_MS` elapses.

use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use loading_cache::{blocking, Cache, CacheConfig, CacheError};

/// Number of concurrent reader tasks
const READERS: u64 = 8;
/// Size of the key space readers draw from
const KEY_SPACE: u64 = 2_000;
/// Simulated latency of the backing source
const SOURCE_LATENCY: Duration = Duration::from_millis(20);

#[derive(Debug, Default)]
struct Tally {
    ok: AtomicU64,
    not_found: AtomicU64,
    failed: AtomicU64,
}

/// Entry point for the demo workload.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load cache configuration from environment variables
/// 3. Build the cache over a simulated backing source
/// 4. Spawn reader tasks
/// 5. Wait for Ctrl+C, SIGTERM or the demo duration
/// 6. Stop readers and close the cache
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loading_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CacheConfig::from_env();
    let cache = Cache::new(config, blocking(fetch_from_source)).context("building cache")?;

    let tally = Arc::new(Tally::default());
    let (stop_tx, stop_rx) = watch::channel(false);

    let readers: Vec<_> = (0..READERS)
        .map(|reader| {
            let cache = cache.clone();
            let tally = Arc::clone(&tally);
            let mut stop_rx = stop_rx.clone();
            tokio::spawn(async move {
                let mut seed = reader.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
                while !*stop_rx.borrow() {
                    // Skewed key choice so some keys stay hot
                    seed ^= seed << 13;
                    seed ^= seed >> 7;
                    seed ^= seed << 17;
                    let key = (seed % KEY_SPACE) % (1 + seed % 64 * 32);

                    match cache.get(&key).await {
                        Ok(_) => tally.ok.fetch_add(1, Ordering::Relaxed),
                        Err(CacheError::NotFound) => {
                            tally.not_found.fetch_add(1, Ordering::Relaxed)
                        }
                        Err(_) => tally.failed.fetch_add(1, Ordering::Relaxed),
                    };

                    tokio::select! {
                        _ = stop_rx.changed() => {}
                        _ = tokio::time::sleep(Duration::from_millis(1)) => {}
                    }
                }
            })
        })
        .collect();
    info!("Started {} readers", READERS);

    shutdown_signal().await;
    stop_tx.send(true).context("signalling readers")?;
    for reader in readers {
        if let Err(err) = reader.await {
            warn!("Reader task failed: {}", err);
        }
    }

    info!(
        "Workload finished: ok={}, not_found={}, failed={}, cached={}",
        tally.ok.load(Ordering::Relaxed),
        tally.not_found.load(Ordering::Relaxed),
        tally.failed.load(Ordering::Relaxed),
        cache.len()
    );

    cache.close().await;
    Ok(())
}

/// Simulated blocking backing source.
///
/// Every 97th key does not exist and every 89th key fails, so both error
/// paths show up in the workload.
fn fetch_from_source(key: u64) -> anyhow::Result<Option<String>> {
    std::thread::sleep(SOURCE_LATENCY);
    if key % 97 == 0 {
        return Ok(None);
    }
    if key % 89 == 0 {
        return Err(anyhow!("source timed out for key {}", key));
    }
    Ok(Some(format!("record-{}", key)))
}

/// Waits for shutdown (Ctrl+C, SIGTERM or the configured demo duration).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let deadline = async {
        match env::var("DEMO_DURATION_MS").ok().and_then(|v| v.parse().ok()) {
            Some(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
        _ = deadline => {
            info!("Demo duration elapsed, initiating shutdown...");
        }
    }
}
