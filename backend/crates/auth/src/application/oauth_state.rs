//! OAuth State Store
//!
//! Single-use CSRF `state` values for the OAuth redirect round trip,
//! held in process memory with a fixed lifetime.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use platform::crypto::random_token_url_safe;
use tokio::task::JoinHandle;

/// Lifetime of an issued state (10 minutes)
pub const OAUTH_STATE_TTL: Duration = Duration::from_secs(600);

const STATE_BYTES: usize = 32;

#[derive(Debug)]
pub struct OAuthStateStore {
    states: DashMap<String, Instant>,
    ttl: Duration,
}

impl Default for OAuthStateStore {
    fn default() -> Self {
        Self::new(OAUTH_STATE_TTL)
    }
}

impl OAuthStateStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            states: DashMap::new(),
            ttl,
        }
    }

    /// Create and remember a new state value
    pub fn issue(&self) -> String {
        let state = random_token_url_safe(STATE_BYTES);
        self.states.insert(state.clone(), Instant::now());
        state
    }

    /// Consume a state; true only for a known, unexpired value
    pub fn take(&self, state: &str) -> bool {
        self.states
            .remove(state)
            .is_some_and(|(_, issued_at)| issued_at.elapsed() < self.ttl)
    }

    /// Drop expired states, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let before = self.states.len();
        self.states
            .retain(|_, issued_at| issued_at.elapsed() < self.ttl);
        before - self.states.len()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Purge expired states every `every`
    pub fn spawn_cleanup(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let purged = self.purge_expired();
                if purged > 0 {
                    tracing::debug!(purged, "Purged expired OAuth states");
                }
            }
        })
    }
}
