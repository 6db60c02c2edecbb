//! # reelcache
//!
//! Caching and throughput-control substrate for a media-browsing front
//! end that aggregates a home media server with third-party metadata and
//! tracking services.
//!
//! Everything an upstream integration needs sits here:
//!
//! - [`BucketStore`] - in-memory TTL store partitioned into named buckets,
//!   each with hit/miss/set/delete counters.
//! - [`CacheAside`] - check the store, compute on miss, store the result.
//! - [`RateLimitedGateway`] - per-credential-tier gateway combining the
//!   cache with a bounded-concurrency, bounded-rate scheduler and an
//!   upstream error taxonomy.
//! - [`DiskImageCache`] - content-addressed on-disk cache for transformed
//!   image payloads with age-based garbage collection.
//!
//! Wiring is explicit: build a [`Registry`] from [`Settings`] at startup
//! and pass it to whatever needs caching or upstream access.
//!
//! ```no_run
//! use std::sync::Arc;
//! use reelcache::{HttpUpstream, Registry, Settings};
//!
//! let registry = Registry::new(Settings::default());
//! let upstream = Arc::new(HttpUpstream::new("https://api.themoviedb.org/3"));
//! let tmdb = registry.default_gateway(upstream, "tmdb");
//! ```

pub mod config;
pub mod core;
pub mod disk;
pub mod error;
pub mod gateway;
pub mod hash;
pub mod http;
pub mod registry;


pub use config::{BucketSettings, Settings, TtlSettings};
pub use core::{Bucket, BucketStats, BucketStore, CacheAside, RateLimiterConfig, RequestScheduler};
pub use disk::{DiskCacheStats, DiskImageCache, FitMode, ImageFormat, ImageRequest};
pub use error::UpstreamError;
pub use gateway::{RateLimitedGateway, Upstream, UsageStats};
pub use hash::{canonical_json, compose_key, hash_key};
pub use http::HttpUpstream;
pub use registry::Registry;
