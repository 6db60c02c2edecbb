//! In-memory, TTL-based key-value store partitioned into named buckets.
//!
//! Each bucket carries its own default TTL and hit/miss/set/delete counters.
//! Expired entries are never returned: every read checks expiry lazily, and
//! an optional background sweep reclaims them proactively to bound memory.
//! Operations against an unknown bucket degrade to no-ops/misses with a
//! logged warning rather than failing - callers that mistype a bucket name
//! get no caching, not a crash.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::Instant;

struct Entry {
    value: Arc<Value>,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// A named partition of the cache with its own default TTL and counters.
///
/// Counters are monotone for the process lifetime; `flush` empties entries
/// but never touches them.
pub struct Bucket {
    name: String,
    default_ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
}

impl Bucket {
    fn new(name: String, default_ttl: Duration) -> Self {
        Bucket {
            name,
            default_ttl,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sets: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn stats(&self) -> BucketStats {
        let now = Instant::now();
        let entries = self.entries.lock();
        let mut key_count = 0;
        let mut approx_memory_bytes = 0;
        for entry in entries.values().filter(|e| e.is_live(now)) {
            key_count += 1;
            approx_memory_bytes += entry.value.to_string().len();
        }

        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let hit_rate = if hits + misses > 0 {
            let rate = hits as f64 / (hits + misses) as f64 * 100.0;
            (rate * 100.0).round() / 100.0
        } else {
            0.0
        };

        BucketStats {
            bucket: self.name.clone(),
            key_count,
            hits,
            misses,
            hit_rate,
            approx_memory_bytes,
        }
    }
}

/// Per-bucket statistics snapshot.
///
/// `approx_memory_bytes` is the summed serialized length of every live
/// value - an observability approximation, not an accounting figure, and it
/// never drives eviction.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BucketStats {
    pub bucket: String,
    pub key_count: usize,
    pub hits: u64,
    pub misses: u64,
    /// hits / (hits + misses) * 100, rounded to two decimals; 0 when the
    /// bucket has seen no reads.
    pub hit_rate: f64,
    pub approx_memory_bytes: usize,
}

/// The multi-bucket TTL store shared by every upstream integration.
pub struct BucketStore {
    buckets: RwLock<HashMap<String, Arc<Bucket>>>,
}

impl BucketStore {
    pub fn new() -> Self {
        BucketStore {
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// Create a bucket, or return the existing one if `name` is taken.
    pub fn create_bucket(&self, name: &str, default_ttl: Duration) -> Arc<Bucket> {
        let mut buckets = self.buckets.write();
        if let Some(bucket) = buckets.get(name) {
            return Arc::clone(bucket);
        }

        let bucket = Arc::new(Bucket::new(name.to_string(), default_ttl));
        buckets.insert(name.to_string(), Arc::clone(&bucket));
        tracing::info!(
            "created cache bucket: {} with default TTL: {}s",
            name,
            default_ttl.as_secs()
        );
        bucket
    }

    fn bucket(&self, name: &str) -> Option<Arc<Bucket>> {
        self.buckets.read().get(name).cloned()
    }

    /// Fetch a value if it is present and unexpired.
    ///
    /// Increments exactly one of hits/misses when the bucket exists. An
    /// unknown bucket logs a warning and reads as a miss without touching
    /// any counter.
    pub fn get(&self, bucket: &str, key: &str) -> Option<Arc<Value>> {
        let Some(b) = self.bucket(bucket) else {
            tracing::warn!("cache bucket '{}' not found", bucket);
            return None;
        };

        let now = Instant::now();
        let mut entries = b.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => {
                b.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("cache HIT: {}:{}", bucket, key);
                Some(Arc::clone(&entry.value))
            }
            Some(_) => {
                // Expired but not yet swept; reclaim on the way out
                entries.remove(key);
                b.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("cache MISS: {}:{}", bucket, key);
                None
            }
            None => {
                b.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("cache MISS: {}:{}", bucket, key);
                None
            }
        }
    }

    /// Store a value with `expires_at = now + (ttl or the bucket default)`.
    ///
    /// Returns `false` without storing anything when the bucket does not
    /// exist.
    pub fn set(
        &self,
        bucket: &str,
        key: &str,
        value: impl Into<Arc<Value>>,
        ttl: Option<Duration>,
    ) -> bool {
        let Some(b) = self.bucket(bucket) else {
            tracing::warn!("cache bucket '{}' not found", bucket);
            return false;
        };

        let effective_ttl = ttl.unwrap_or(b.default_ttl);
        let entry = Entry {
            value: value.into(),
            expires_at: Instant::now() + effective_ttl,
        };
        b.entries.lock().insert(key.to_string(), entry);
        b.sets.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            "cache SET: {}:{} (TTL: {}s)",
            bucket,
            key,
            effective_ttl.as_secs()
        );
        true
    }

    /// Remove a key. Returns `true` only if the key was present; a missing
    /// key or bucket returns `false`.
    pub fn del(&self, bucket: &str, key: &str) -> bool {
        let Some(b) = self.bucket(bucket) else {
            return false;
        };

        if b.entries.lock().remove(key).is_some() {
            b.deletes.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("cache DELETE: {}:{}", bucket, key);
            true
        } else {
            false
        }
    }

    /// Empty the named bucket, or every bucket when `bucket` is `None`.
    /// Counters are left untouched.
    pub fn flush(&self, bucket: Option<&str>) {
        match bucket {
            Some(name) => {
                if let Some(b) = self.bucket(name) {
                    b.entries.lock().clear();
                    tracing::info!("flushed cache bucket: {}", name);
                }
            }
            None => {
                for b in self.buckets.read().values() {
                    b.entries.lock().clear();
                }
                tracing::info!("flushed all cache buckets");
            }
        }
    }

    /// All live key names in a bucket.
    ///
    /// Expired-but-unswept entries are filtered out, so the result is
    /// consistent with what `get` would currently return.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let Some(b) = self.bucket(bucket) else {
            return Vec::new();
        };

        let now = Instant::now();
        b.entries
            .lock()
            .iter()
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Statistics for one bucket, or for every bucket when `bucket` is
    /// `None`. An unknown bucket name yields an empty list.
    pub fn stats(&self, bucket: Option<&str>) -> Vec<BucketStats> {
        match bucket {
            Some(name) => self.bucket(name).map(|b| b.stats()).into_iter().collect(),
            None => {
                let mut stats: Vec<_> =
                    self.buckets.read().values().map(|b| b.stats()).collect();
                stats.sort_by(|a, b| a.bucket.cmp(&b.bucket));
                stats
            }
        }
    }

    /// Drop every expired entry across all buckets. Returns the number
    /// reclaimed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        for b in self.buckets.read().values() {
            let mut entries = b.entries.lock();
            let before = entries.len();
            entries.retain(|_, entry| entry.is_live(now));
            removed += before - entries.len();
        }
        if removed > 0 {
            tracing::debug!("sweep reclaimed {} expired cache entries", removed);
        }
        removed
    }

    /// Spawn a background task that sweeps expired entries on a timer.
    ///
    /// Not required for correctness - reads already check expiry - but it
    /// bounds memory held by entries nobody reads again.
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store = self;
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // interval fires immediately once; skip that tick
            tick.tick().await;
            loop {
                tick.tick().await;
                store.sweep();
            }
        })
    }
}

impl Default for BucketStore {
    fn default() -> Self {
        Self::new()
    }
}
