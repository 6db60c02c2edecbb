//! Cache-aside orchestration: check the store, compute on miss, store the
//! result.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use super::store::BucketStore;

/// Wraps an async producer with cache-aside semantics over a shared
/// [`BucketStore`].
///
/// Concurrent misses on the same key are *not* deduplicated: two callers
/// missing simultaneously both invoke their producer. Callers that need
/// single-flight semantics must layer them on top.
#[derive(Clone)]
pub struct CacheAside {
    store: Arc<BucketStore>,
}

impl CacheAside {
    pub fn new(store: Arc<BucketStore>) -> Self {
        CacheAside { store }
    }

    pub fn store(&self) -> &Arc<BucketStore> {
        &self.store
    }

    /// Return the cached value for `bucket`/`key`, or invoke `producer`,
    /// store its result, and return it.
    ///
    /// A producer failure propagates unchanged and leaves the cache
    /// untouched - a failed result is never cached.
    pub async fn get_or_set<F, Fut, E>(
        &self,
        bucket: &str,
        key: &str,
        producer: F,
        ttl: Option<Duration>,
    ) -> Result<Arc<Value>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        if let Some(cached) = self.store.get(bucket, key) {
            return Ok(cached);
        }

        let value = Arc::new(producer().await?);
        self.store.set(bucket, key, Arc::clone(&value), ttl);
        Ok(value)
    }
}
