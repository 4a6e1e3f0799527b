//! Sliding-window rate limiting per client
//!
//! Every admitted request leaves a timestamp behind. On each new request:
//!
//! ```text
//! evict every timestamp older than now - window   (all clients)
//!     ↓
//! count what is left for this client
//!     ↓
//! count >= max? → Rejected { retry_after }
//!     ↓
//! record now, Admitted
//! ```
//!
//! Eviction happens inline on every request; there is no background sweeper.
//! State is local to the process: replicas behind a load balancer each keep
//! their own counts.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Rate limiter settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Length of the trailing window
    pub window: Duration,
    /// Requests allowed per client inside one window
    pub max_requests: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(15 * 60),
            max_requests: 100,
        }
    }
}

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// Over the cap; `retry_after` is the time until the oldest counted
    /// request leaves the window
    Rejected { retry_after: Duration },
}

/// Per-client sliding window limiter
///
/// Owned explicitly and shared through `RelayState`, so tests can build as
/// many isolated limiters as they like.
pub struct RateLimiter {
    config: RateLimitConfig,
    /// Admission timestamps per client key, oldest first
    entries: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Check and record a request from `client` at the current time
    pub fn check(&self, client: &str) -> Admission {
        self.check_at(client, Instant::now())
    }

    /// Check and record a request from `client` at `now`
    pub fn check_at(&self, client: &str, now: Instant) -> Admission {
        // A poisoned lock only means another handler panicked mid-update;
        // the map itself is still usable.
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Instant can't go below process start; treat that as "nothing expired"
        if let Some(cutoff) = now.checked_sub(self.config.window) {
            entries.retain(|_, stamps| {
                while stamps.front().is_some_and(|t| *t < cutoff) {
                    stamps.pop_front();
                }
                !stamps.is_empty()
            });
        }

        let stamps = entries.entry(client.to_string()).or_default();
        if stamps.len() >= self.config.max_requests {
            let retry_after = stamps
                .front()
                .and_then(|oldest| oldest.checked_add(self.config.window))
                .map(|expiry| expiry.saturating_duration_since(now))
                .unwrap_or(self.config.window);
            return Admission::Rejected { retry_after };
        }

        stamps.push_back(now);
        Admission::Admitted
    }

    /// Number of requests currently counted for `client`
    #[cfg(test)]
    pub fn tracked(&self, client: &str) -> usize {
        self.entries
            .lock()
            .map(|e| e.get(client).map_or(0, VecDeque::len))
            .unwrap_or(0)
    }

    /// Number of distinct clients with live entries
    #[cfg(test)]
    pub fn tracked_clients(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }
}
