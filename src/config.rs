//! Configuration consumed by the substrate.
//!
//! Owned by the embedding application and read-only here. Defaults mirror
//! the stock deployment: one bucket per upstream service, a per-resource
//! TTL table, and two rate-limiter tiers.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::RateLimiterConfig;

/// One cache bucket to create at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSettings {
    pub name: String,
    pub default_ttl_secs: u64,
}

impl BucketSettings {
    pub fn new(name: impl Into<String>, default_ttl_secs: u64) -> Self {
        BucketSettings {
            name: name.into(),
            default_ttl_secs,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}

/// Per-resource TTLs for the media server catalog, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlexTtl {
    pub metadata: u64,
    pub search: u64,
    pub libraries: u64,
    pub ondeck: u64,
    pub watchlist: u64,
}

impl Default for PlexTtl {
    fn default() -> Self {
        PlexTtl {
            metadata: 3600,
            search: 300,
            libraries: 86400,
            ondeck: 60,
            watchlist: 300,
        }
    }
}

/// Per-resource TTLs for the metadata service, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbTtl {
    pub trending: u64,
    pub details: u64,
    pub search: u64,
    pub images: u64,
    pub credits: u64,
}

impl Default for TmdbTtl {
    fn default() -> Self {
        TmdbTtl {
            trending: 3600,
            details: 86400,
            search: 1800,
            images: 604800,
            credits: 86400,
        }
    }
}

/// Per-resource TTLs for the tracking service, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraktTtl {
    pub watchlist: u64,
    pub history: u64,
    pub popular: u64,
    pub trending: u64,
}

impl Default for TraktTtl {
    fn default() -> Self {
        TraktTtl {
            watchlist: 300,
            history: 60,
            popular: 3600,
            trending: 1800,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlSettings {
    pub plex: PlexTtl,
    pub tmdb: TmdbTtl,
    pub trakt: TraktTtl,
}

/// Full configuration surface of the substrate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Buckets created at startup. Creating them all up front makes a
    /// typo'd bucket name in application code observable from `stats()`
    /// immediately, rather than hiding behind a quietly-always-missing
    /// cache.
    pub buckets: Vec<BucketSettings>,
    pub ttl: TtlSettings,
    /// Tier for the shared default credential.
    pub default_tier: RateLimiterConfig,
    /// Tier for callers supplying their own credential.
    pub custom_tier: RateLimiterConfig,
    pub image_cache_dir: PathBuf,
    /// Default max age for disk cache cleanup sweeps, in seconds.
    pub cleanup_max_age_secs: u64,
    /// Interval between in-memory expiry sweeps, in seconds.
    pub sweep_interval_secs: u64,
}

impl Settings {
    pub fn cleanup_max_age(&self) -> Duration {
        Duration::from_secs(self.cleanup_max_age_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            buckets: vec![
                BucketSettings::new("plex", 3600),
                BucketSettings::new("tmdb", 3600),
                BucketSettings::new("trakt", 1800),
                BucketSettings::new("image", 86400),
                BucketSettings::new("general", 600),
            ],
            ttl: TtlSettings::default(),
            default_tier: RateLimiterConfig::default_tier(),
            custom_tier: RateLimiterConfig::custom_tier(),
            image_cache_dir: PathBuf::from("cache/images"),
            cleanup_max_age_secs: 7 * 24 * 60 * 60,
            sweep_interval_secs: 120,
        }
    }
}
