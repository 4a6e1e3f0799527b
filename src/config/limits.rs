//! Rate limit configuration

use serde::Deserialize;
use std::time::Duration;

use crate::relay::rate_limit::RateLimitConfig;

/// Rate limit settings
#[derive(Debug, Clone)]
pub struct RateLimit {
    /// Sliding window length
    pub window: Duration,
    /// Requests per client per window
    pub max_requests: usize,
    /// Key clients by the first X-Forwarded-For entry instead of the peer IP.
    /// Only enable behind a reverse proxy that sets the header itself.
    pub trust_forwarded_for: bool,
}

impl Default for RateLimit {
    fn default() -> Self {
        let limiter = RateLimitConfig::default();
        Self {
            window: limiter.window,
            max_requests: limiter.max_requests,
            trust_forwarded_for: false,
        }
    }
}

/// Rate limit settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileRateLimit {
    pub window_secs: Option<u64>,
    pub max_requests: Option<usize>,
    pub trust_forwarded_for: Option<bool>,
}

impl RateLimit {
    /// Create from file config with defaults
    pub fn from_file(file: Option<FileRateLimit>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            window: file
                .window_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.window),
            max_requests: file.max_requests.unwrap_or(defaults.max_requests),
            trust_forwarded_for: file
                .trust_forwarded_for
                .unwrap_or(defaults.trust_forwarded_for),
        }
    }

    /// Limiter settings
    pub fn limiter(&self) -> RateLimitConfig {
        RateLimitConfig {
            window: self.window,
            max_requests: self.max_requests,
        }
    }
}
