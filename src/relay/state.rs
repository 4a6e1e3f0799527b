//! Relay state shared by all handlers

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::Config;

use super::rate_limit::RateLimiter;
use super::upstream::UpstreamClient;

/// Fixed parameters for every upstream call
#[derive(Debug, Clone)]
pub(crate) struct DispatchSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

/// Shared state for the relay server
///
/// Cheap to clone: everything heavy sits behind an `Arc`.
#[derive(Clone)]
pub struct RelayState {
    /// Upstream chat-completion client
    pub(crate) upstream: UpstreamClient,
    /// Per-client sliding window limiter
    pub(crate) limiter: Arc<RateLimiter>,
    /// System instruction prepended to every conversation
    pub(crate) system_prompt: Arc<str>,
    /// Model and sampling parameters
    pub(crate) dispatch: Arc<DispatchSettings>,
    /// Environment name reported by /health
    pub(crate) environment: Arc<str>,
    /// Key clients by X-Forwarded-For instead of the peer address
    pub(crate) trust_forwarded_for: bool,
}

impl RelayState {
    /// Build state from configuration
    ///
    /// The per-request deadline is applied on each call, so the HTTP client
    /// itself only carries pooling settings.
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .build()
            .context("Failed to create HTTP client")?;

        let upstream = UpstreamClient::new(
            http,
            &config.upstream.base_url,
            &config.upstream.path,
            config.upstream.api_key.clone(),
        );
        tracing::debug!(endpoint = %upstream.endpoint(), "Upstream client ready");

        let limiter = Arc::new(RateLimiter::new(config.rate_limit.limiter()));
        let limits = limiter.config();
        tracing::debug!(
            window_secs = limits.window.as_secs(),
            max_requests = limits.max_requests,
            "Rate limiter ready"
        );

        Ok(Self::new(upstream, limiter, config))
    }

    /// Assemble state around an existing client and limiter
    pub(crate) fn new(upstream: UpstreamClient, limiter: Arc<RateLimiter>, config: &Config) -> Self {
        Self {
            upstream,
            limiter,
            system_prompt: Arc::from(config.system_prompt.as_str()),
            dispatch: Arc::new(DispatchSettings {
                model: config.upstream.model.clone(),
                max_tokens: config.upstream.max_tokens,
                temperature: config.upstream.temperature,
                timeout: config.upstream.timeout,
            }),
            environment: Arc::from(config.environment.as_str()),
            trust_forwarded_for: config.rate_limit.trust_forwarded_for,
        }
    }
}
