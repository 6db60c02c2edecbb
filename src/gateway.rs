//! Rate-limited, cache-backed gateway to one upstream endpoint.
//!
//! One gateway instance exists per upstream credential tier. Responses are
//! cached through [`CacheAside`]; actual network calls go through a
//! [`RequestScheduler`] so the tier's quota is never exceeded, however many
//! callers pile in at once.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::core::{BucketStore, CacheAside, RateLimiterConfig, RequestScheduler};
use crate::error::UpstreamError;
use crate::hash::canonical_json;

/// The seam to the real upstream service.
///
/// Implementations perform one GET against the base endpoint and parse the
/// JSON body, mapping failures to the [`UpstreamError`] taxonomy. The
/// gateway adds caching, scheduling, and usage accounting on top.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn get_json(&self, path: &str, params: &Value) -> Result<Value, UpstreamError>;
}

/// Snapshot of one gateway's usage counters.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct UsageStats {
    pub requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub errors: u64,
    #[serde(skip)]
    pub last_reset: SystemTime,
}

struct UsageCounters {
    requests: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    errors: AtomicU64,
    last_reset: Mutex<SystemTime>,
}

impl UsageCounters {
    fn new() -> Self {
        UsageCounters {
            requests: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            last_reset: Mutex::new(SystemTime::now()),
        }
    }

    fn snapshot(&self) -> UsageStats {
        UsageStats {
            requests: self.requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            last_reset: *self.last_reset.lock(),
        }
    }

    fn reset(&self) {
        self.requests.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
        *self.last_reset.lock() = SystemTime::now();
    }
}

/// Cache-backed, quota-protected access to one upstream base endpoint.
pub struct RateLimitedGateway {
    upstream: Arc<dyn Upstream>,
    cache: CacheAside,
    bucket: String,
    scheduler: RequestScheduler,
    usage: UsageCounters,
}

impl RateLimitedGateway {
    pub fn new(
        upstream: Arc<dyn Upstream>,
        store: Arc<BucketStore>,
        bucket: impl Into<String>,
        config: RateLimiterConfig,
    ) -> Self {
        let bucket = bucket.into();
        tracing::info!(
            "gateway initialized for bucket '{}' ({} concurrent, {}/{}ms)",
            bucket,
            config.concurrency,
            config.interval_cap,
            config.interval_ms
        );
        RateLimitedGateway {
            upstream,
            cache: CacheAside::new(store),
            bucket,
            scheduler: RequestScheduler::new(config),
            usage: UsageCounters::new(),
        }
    }

    /// Fetch a parsed upstream response, serving from cache when possible.
    ///
    /// `cache_key` defaults to `{path}:{canonical-json params}`. On a miss
    /// the network call is admitted by the scheduler, and its result is
    /// cached for `ttl` (or the bucket's default). Failures are classified
    /// into [`UpstreamError`], counted, and rethrown; nothing is retried
    /// here.
    pub async fn fetch(
        &self,
        path: &str,
        params: &Value,
        cache_key: Option<&str>,
        ttl: Option<Duration>,
    ) -> Result<Arc<Value>, UpstreamError> {
        let key = match cache_key {
            Some(key) => key.to_string(),
            None => format!("{path}:{}", canonical_json(params)),
        };

        let missed = AtomicBool::new(false);
        let result = self
            .cache
            .get_or_set(
                &self.bucket,
                &key,
                || async {
                    missed.store(true, Ordering::Relaxed);
                    self.usage.cache_misses.fetch_add(1, Ordering::Relaxed);
                    self.scheduler
                        .run(async {
                            self.usage.requests.fetch_add(1, Ordering::Relaxed);
                            tracing::debug!("upstream request: {}", path);
                            self.upstream.get_json(path, params).await
                        })
                        .await
                },
                ttl,
            )
            .await;

        match &result {
            Ok(_) => {
                if !missed.load(Ordering::Relaxed) {
                    self.usage.cache_hits.fetch_add(1, Ordering::Relaxed);
                }
            }
            Err(err) => {
                self.usage.errors.fetch_add(1, Ordering::Relaxed);
                tracing::error!("upstream request failed for {}: {}", path, err);
            }
        }
        result
    }

    /// Probe `probe_path` once, bypassing the cache, to check whether the
    /// credential behind this gateway is accepted. Any failure reads as
    /// invalid.
    pub async fn validate_credential(&self, probe_path: &str) -> bool {
        let probe = self.scheduler.run(async {
            self.usage.requests.fetch_add(1, Ordering::Relaxed);
            self.upstream
                .get_json(probe_path, &Value::Object(Default::default()))
                .await
        });
        match probe.await {
            Ok(_) => true,
            Err(err) => {
                self.usage.errors.fetch_add(1, Ordering::Relaxed);
                tracing::error!("credential validation failed: {}", err);
                false
            }
        }
    }

    pub fn usage_stats(&self) -> UsageStats {
        self.usage.snapshot()
    }

    pub fn reset_usage_stats(&self) {
        self.usage.reset();
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn config(&self) -> RateLimiterConfig {
        self.scheduler.config()
    }
}
