//! Loader Module
//!
//! The read-through source consulted on a cache miss.

use std::future::Future;
use std::sync::Arc;

/// Source of values for keys missing from the cache.
///
/// `Ok(Some(v))` populates the cache, `Ok(None)` reports that the key has no
/// value and `Err` reports a failed load. Neither of the latter is cached.
/// The cache imposes no timeout; bounding load latency is up to the loader.
///
/// Any `Fn(K) -> impl Future<Output = anyhow::Result<Option<V>>>` is a loader:
///
/// ```ignore
/// let cache = Cache::new(config, |id: u64| async move {
///     let row = db.fetch_user(id).await?;
///     Ok(row.map(User::from))
/// })?;
/// ```
pub trait Loader<K, V>: Send + Sync + 'static {
    /// Loads the value for `key`.
    fn load(&self, key: &K) -> impl Future<Output = anyhow::Result<Option<V>>> + Send;
}

impl<K, V, F, Fut> Loader<K, V> for F
where
    K: Clone,
    F: Fn(K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Option<V>>> + Send,
{
    fn load(&self, key: &K) -> impl Future<Output = anyhow::Result<Option<V>>> + Send {
        self(key.clone())
    }
}

// == Blocking Loader ==
/// Adapts a synchronous, possibly blocking function into a [`Loader`].
///
/// Each load runs on tokio's blocking pool so it never stalls the runtime
/// worker that issued the `get`.
pub struct BlockingLoader<F> {
    f: Arc<F>,
}

/// Wraps a blocking `Fn(K) -> anyhow::Result<Option<V>>` as a loader.
pub fn blocking<F>(f: F) -> BlockingLoader<F> {
    BlockingLoader { f: Arc::new(f) }
}

impl<K, V, F> Loader<K, V> for BlockingLoader<F>
where
    K: Clone + Send + 'static,
    V: Send + 'static,
    F: Fn(K) -> anyhow::Result<Option<V>> + Send + Sync + 'static,
{
    fn load(&self, key: &K) -> impl Future<Output = anyhow::Result<Option<V>>> + Send {
        let f = Arc::clone(&self.f);
        let key = key.clone();
        async move { tokio::task::spawn_blocking(move || f(key)).await? }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[tokio::test]
    async fn test_async_closure_loader() {
        let loader = |key: u32| async move {
            let value = if key == 0 { None } else { Some(key * 2) };
            anyhow::Ok(value)
        };

        assert_eq!(loader.load(&21).await.unwrap(), Some(42));
        assert_eq!(loader.load(&0).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_blocking_loader_runs_off_runtime() {
        let loader = blocking(|key: String| -> anyhow::Result<Option<usize>> {
            std::thread::sleep(std::time::Duration::from_millis(5));
            Ok(Some(key.len()))
        });

        assert_eq!(loader.load(&"four".to_string()).await.unwrap(), Some(4));
    }

    #[tokio::test]
    async fn test_blocking_loader_propagates_errors() {
        let loader = blocking(|_: u8| -> anyhow::Result<Option<u8>> { Err(anyhow!("disk gone")) });

        let err = loader.load(&1).await.unwrap_err();
        assert_eq!(err.to_string(), "disk gone");
    }

    #[tokio::test]
    async fn test_blocking_loader_reports_panics_as_errors() {
        let loader = blocking(|_: u8| -> anyhow::Result<Option<u8>> { panic!("loader bug") });

        assert!(loader.load(&1).await.is_err());
    }
}
