//! Rate Limiting Infrastructure
//!
//! Common rate limiting abstractions and an in-process sliding-window
//! implementation.

use std::collections::VecDeque;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window
    pub max_requests: u32,
    /// Time window duration
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window.as_millis() as i64
    }
}

/// Rate limit check result
#[derive(Debug, Clone)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at_ms: i64,
}

/// Trait for rate limit storage backends
#[trait_variant::make(RateLimitStore: Send)]
pub trait LocalRateLimitStore {
    /// Check and increment rate limit counter
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, Box<dyn std::error::Error + Send + Sync>>;

    /// Forget all recorded hits for a key
    async fn reset(&self, key: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

// ============================================================================
// In-memory sliding window
// ============================================================================

/// Sliding-window log kept in a concurrent map
///
/// Each key holds the timestamps of its hits inside the current window.
/// Denied attempts are not recorded, so a blocked client is released once
/// its oldest accepted hit ages out.
#[derive(Debug, Default)]
pub struct InMemoryRateLimiter {
    hits: DashMap<String, VecDeque<i64>>,
}

impl InMemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check and record a hit at an explicit instant (epoch milliseconds)
    pub fn check_at(&self, key: &str, config: &RateLimitConfig, now_ms: i64) -> RateLimitResult {
        let window_start = now_ms - config.window_ms();
        let mut entry = self.hits.entry(key.to_string()).or_default();

        while entry.front().is_some_and(|&t| t <= window_start) {
            entry.pop_front();
        }

        let used = entry.len() as u32;
        let allowed = used < config.max_requests;
        if allowed {
            entry.push_back(now_ms);
        }

        let oldest = entry.front().copied().unwrap_or(now_ms);
        RateLimitResult {
            allowed,
            remaining: config.max_requests.saturating_sub(entry.len() as u32),
            reset_at_ms: oldest + config.window_ms(),
        }
    }

    /// Drop keys whose hits have all aged out
    pub fn prune(&self, config: &RateLimitConfig) -> usize {
        let window_start = now_ms() - config.window_ms();
        let before = self.hits.len();
        self.hits
            .retain(|_, hits| hits.back().is_some_and(|&t| t > window_start));
        before - self.hits.len()
    }
}

impl RateLimitStore for InMemoryRateLimiter {
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.check_at(key, config, now_ms()))
    }

    async fn reset(&self, key: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.hits.remove(key);
        Ok(())
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
