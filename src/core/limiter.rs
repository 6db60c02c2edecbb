//! Bounded-concurrency, bounded-rate task scheduler.
//!
//! One scheduler protects one upstream credential. A task may start only
//! when fewer than `concurrency` tasks are in flight *and* fewer than
//! `interval_cap` tasks have started within the trailing `interval` window.
//! Completion of a task, success or failure alike, frees its concurrency
//! slot for the next queued task.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::time::{Instant, sleep_until};

/// Limits for one credential tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Max simultaneous in-flight calls.
    pub concurrency: usize,
    /// Rolling window length in milliseconds.
    pub interval_ms: u64,
    /// Max calls admitted to start within any window of `interval_ms`.
    pub interval_cap: usize,
}

impl RateLimiterConfig {
    pub const fn new(concurrency: usize, interval_ms: u64, interval_cap: usize) -> Self {
        RateLimiterConfig {
            concurrency,
            interval_ms,
            interval_cap,
        }
    }

    /// Tier for the shared default credential. One credential serves every
    /// caller without a custom one, so the caps are conservative.
    pub const fn default_tier() -> Self {
        RateLimiterConfig::new(50, 1000, 200)
    }

    /// Tier for callers supplying their own credential.
    pub const fn custom_tier() -> Self {
        RateLimiterConfig::new(100, 1000, 1000)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// FIFO-ish admission queue enforcing both caps of a [`RateLimiterConfig`].
///
/// Admission order is never later than submission order: the concurrency
/// gate is a fair semaphore, and the rate gate delays whoever holds a
/// permit without reordering.
pub struct RequestScheduler {
    config: RateLimiterConfig,
    permits: Semaphore,
    /// Start times of calls admitted within the trailing window.
    window: Mutex<VecDeque<Instant>>,
}

impl RequestScheduler {
    /// Both `concurrency` and `interval_cap` must be non-zero: a zero
    /// concurrency would never admit anything, and a zero interval cap
    /// would stop limiting entirely. Config can come from deserialized
    /// input, so this is checked unconditionally.
    ///
    /// # Panics
    ///
    /// Panics if either cap is zero.
    pub fn new(config: RateLimiterConfig) -> Self {
        assert!(config.concurrency > 0, "concurrency must be non-zero");
        assert!(config.interval_cap > 0, "interval_cap must be non-zero");
        RequestScheduler {
            permits: Semaphore::new(config.concurrency),
            window: Mutex::new(VecDeque::with_capacity(config.interval_cap)),
            config,
        }
    }

    pub fn config(&self) -> RateLimiterConfig {
        self.config
    }

    /// Run `task` once both caps admit it, suspending the caller while
    /// queued. The task's output is returned unchanged.
    pub async fn run<T, F>(&self, task: F) -> T
    where
        F: Future<Output = T>,
    {
        // Concurrency cap: the permit is held for the full task duration.
        // The semaphore is owned by this scheduler and never closed.
        let _permit = self
            .permits
            .acquire()
            .await
            .expect("scheduler semaphore closed");

        // Interval cap: record the start under the lock, or wait until the
        // oldest start in the window ages out and re-check.
        loop {
            let deadline = {
                let mut window = self.window.lock();
                let now = Instant::now();
                while window
                    .front()
                    .is_some_and(|&t| now.duration_since(t) >= self.config.interval())
                {
                    window.pop_front();
                }
                if window.len() < self.config.interval_cap {
                    window.push_back(now);
                    None
                } else {
                    window.front().map(|&t| t + self.config.interval())
                }
            };
            match deadline {
                None => break,
                Some(deadline) => sleep_until(deadline).await,
            }
        }

        task.await
    }
}
