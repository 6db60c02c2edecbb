//! Process-wide wiring, passed by reference instead of hidden in statics.
//!
//! The embedding application builds one [`Registry`] at startup from its
//! [`Settings`] and hands it to whatever needs caching or upstream access.
//! Tests construct their own registry for isolation.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::Settings;
use crate::core::{BucketStore, CacheAside};
use crate::disk::DiskImageCache;
use crate::gateway::{RateLimitedGateway, Upstream};

pub struct Registry {
    settings: Settings,
    store: Arc<BucketStore>,
    cache: CacheAside,
    images: DiskImageCache,
}

impl Registry {
    /// Build the shared store (with every configured bucket created up
    /// front), the cache-aside helper, and the disk image cache.
    pub fn new(settings: Settings) -> Self {
        let store = Arc::new(BucketStore::new());
        for bucket in &settings.buckets {
            store.create_bucket(&bucket.name, bucket.default_ttl());
        }
        let images = DiskImageCache::new(settings.image_cache_dir.clone());

        Registry {
            cache: CacheAside::new(Arc::clone(&store)),
            store,
            images,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<BucketStore> {
        &self.store
    }

    pub fn cache(&self) -> &CacheAside {
        &self.cache
    }

    pub fn images(&self) -> &DiskImageCache {
        &self.images
    }

    /// Gateway on the shared default credential tier.
    pub fn default_gateway(
        &self,
        upstream: Arc<dyn Upstream>,
        bucket: impl Into<String>,
    ) -> RateLimitedGateway {
        RateLimitedGateway::new(
            upstream,
            Arc::clone(&self.store),
            bucket,
            self.settings.default_tier,
        )
    }

    /// Gateway for a caller-supplied credential, on the higher-cap tier.
    pub fn custom_gateway(
        &self,
        upstream: Arc<dyn Upstream>,
        bucket: impl Into<String>,
    ) -> RateLimitedGateway {
        RateLimitedGateway::new(
            upstream,
            Arc::clone(&self.store),
            bucket,
            self.settings.custom_tier,
        )
    }

    /// Start the periodic in-memory expiry sweep with the configured
    /// interval.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        Arc::clone(&self.store).spawn_sweeper(self.settings.sweep_interval())
    }

    /// Run one disk cache cleanup with the configured default max age.
    pub fn cleanup_images(&self) -> usize {
        self.images.cleanup(self.settings.cleanup_max_age())
    }

    /// Run one disk cache cleanup with an explicit max age.
    pub fn cleanup_images_older_than(&self, max_age: Duration) -> usize {
        self.images.cleanup(max_age)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn registry_creates_configured_buckets_up_front() {
        let registry = Registry::new(Settings::default());
        let stats = registry.store().stats(None);
        let names: Vec<_> = stats.iter().map(|s| s.bucket.as_str()).collect();

        assert_eq!(names, ["general", "image", "plex", "tmdb", "trakt"]);
        assert!(stats.iter().all(|s| s.hits == 0 && s.misses == 0));
    }

    #[test]
    fn configured_buckets_accept_writes() {
        let registry = Registry::new(Settings::default());
        assert!(registry.store().set("tmdb", "k", json!(1), None));
        assert!(!registry.store().set("typo", "k", json!(1), None));
    }
}
