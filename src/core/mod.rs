pub mod cache_aside;
pub mod limiter;
pub mod store;

#[cfg(test)]
mod store_tests;

pub use cache_aside::CacheAside;
pub use limiter::{RateLimiterConfig, RequestScheduler};
pub use store::{Bucket, BucketStats, BucketStore};
