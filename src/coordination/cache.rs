use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::store::{KeyValueStore, KeyValueStoreExt};
use crate::utils::error::CoordinationError;

/// Memoization wrapper over the shared store.
///
/// There is no single-flight guarantee: concurrent misses on one key each run
/// their compute step and the last writer wins on the cached copy. The
/// wrapped computations are idempotent, so this stays lock-free. Revisit if
/// an at-most-once guarantee is ever required.
pub struct ResponseCache {
    store: Arc<dyn KeyValueStore>,
    default_ttl: Duration,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn KeyValueStore>, default_ttl: Duration) -> Self {
        Self { store, default_ttl }
    }

    /// Return the live cached value for `key`, or run `compute`, cache its
    /// result for `ttl` (the configured default when `None`), and return it.
    ///
    /// An unreachable store degrades to a plain call to `compute`: the read
    /// is bypassed and a failed write is logged, never surfaced.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        compute: F,
    ) -> Result<T, CoordinationError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, CoordinationError>> + Send,
    {
        match self.store.get_json::<T>(key).await {
            Ok(Some(hit)) => {
                debug!(key, "cache hit");
                return Ok(hit);
            }
            Ok(None) => {}
            Err(err) => {
                warn!(key, error = %err, "cache read failed, bypassing");
            }
        }

        let value = compute().await?;

        let ttl = ttl.unwrap_or(self.default_ttl);
        if let Err(err) = self.store.set_json(key, &value, Some(ttl)).await {
            warn!(key, error = %err, "cache write failed, returning uncached value");
        }
        Ok(value)
    }

    /// Drop one exact key. Returns whether it was present.
    pub async fn invalidate(&self, key: &str) -> Result<bool, CoordinationError> {
        Ok(self.store.delete(key).await?)
    }

    /// Drop every key matching a glob pattern. Requires a full key scan,
    /// O(total keys). Administrative flushes only, never the hot path.
    pub async fn invalidate_pattern(&self, pattern: &str) -> Result<usize, CoordinationError> {
        let keys = self.store.keys(pattern).await?;
        let mut removed = 0;
        for key in &keys {
            if self.store.delete(key).await? {
                removed += 1;
            }
        }
        if removed > 0 {
            info!(pattern, removed, "cache entries invalidated");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::store::test_support::FailingStore;
    use crate::store::MemoryStore;

    fn cache(store: Arc<dyn KeyValueStore>) -> ResponseCache {
        ResponseCache::new(store, Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn warm_cache_skips_compute() {
        let cache = cache(Arc::new(MemoryStore::new()));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let reply: String = cache
                .get_or_compute("qa_cache:greeting", None, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("hello".to_string())
                })
                .await
                .unwrap();
            assert_eq!(reply, "hello");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_recomputes() {
        let cache = cache(Arc::new(MemoryStore::new()));
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let _: String = cache
                .get_or_compute("k", Some(Duration::from_millis(30)), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("v".to_string())
                })
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(60)).await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn compute_error_is_not_cached() {
        let cache = cache(Arc::new(MemoryStore::new()));

        let failed: Result<String, _> = cache
            .get_or_compute("k", None, || async {
                Err(CoordinationError::ComputeFailure("provider down".into()))
            })
            .await;
        assert!(failed.is_err());

        let recovered: String = cache
            .get_or_compute("k", None, || async { Ok("ok".to_string()) })
            .await
            .unwrap();
        assert_eq!(recovered, "ok");
    }

    #[tokio::test]
    async fn store_outage_bypasses_cache() {
        let cache = cache(Arc::new(FailingStore));
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let reply: String = cache
                .get_or_compute("k", None, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("fresh".to_string())
                })
                .await
                .unwrap();
            assert_eq!(reply, "fresh");
        }
        // no cache available, every call computes
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn pattern_invalidation_removes_matches_only() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache(store.clone());

        store.set("qa_cache:a", "1", None).await.unwrap();
        store.set("qa_cache:b", "2", None).await.unwrap();
        store.set("user_context:u1", "3", None).await.unwrap();

        let removed = cache.invalidate_pattern("qa_cache:*").await.unwrap();
        assert_eq!(removed, 2);
        assert!(store.get("qa_cache:a").await.unwrap().is_none());
        assert!(store.get("user_context:u1").await.unwrap().is_some());
    }
}
