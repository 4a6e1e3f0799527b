//! Chat-completion client for the upstream model provider
//!
//! One POST per call, no retries. Failures are classified into
//! `UpstreamError` so the endpoint can map them without looking at provider
//! bodies.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::helpers::{key_fingerprint, truncate_for_log};
use super::models::ChatMessage;

/// Marker left in the config template; a key containing it was never set
const PLACEHOLDER_KEY_MARKER: &str = "YOUR_ACTUAL";

/// Classified upstream failure
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Missing, placeholder or rejected credentials (401)
    #[error("upstream rejected or missing credentials")]
    AuthConfig,

    /// Provider is throttling us (429)
    #[error("upstream rate limited")]
    RateLimited,

    /// Any other non-2xx status
    #[error("upstream unavailable (status {status})")]
    Unavailable { status: u16 },

    /// No response within the deadline
    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),

    /// 2xx without usable message content
    #[error("upstream returned no content")]
    EmptyResponse,

    /// Could not reach the provider at all
    #[error("cannot reach upstream: {0}")]
    Network(String),
}

/// Body sent to `<base_url><path>`
#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Usable key, or `None` when unset, blank, or still the template value
fn usable_key(api_key: Option<&str>) -> Option<&str> {
    api_key
        .map(str::trim)
        .filter(|k| !k.is_empty() && !k.contains(PLACEHOLDER_KEY_MARKER))
}

/// Short fingerprint of a configured key for logs, `None` if it is unusable
pub fn fingerprint(api_key: Option<&str>) -> Option<String> {
    usable_key(api_key).map(key_fingerprint)
}

/// Client for an OpenAI-style chat completion endpoint
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl UpstreamClient {
    pub fn new(http: reqwest::Client, base_url: &str, path: &str, api_key: Option<String>) -> Self {
        let endpoint = format!("{}{}", base_url.trim_end_matches('/'), path);
        Self {
            http,
            endpoint,
            api_key,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn usable_key(&self) -> Option<&str> {
        usable_key(self.api_key.as_deref())
    }

    /// Send one completion request and return the raw message content.
    pub async fn send(
        &self,
        request: &CompletionRequest<'_>,
        timeout: Duration,
    ) -> Result<String, UpstreamError> {
        let Some(key) = self.usable_key() else {
            tracing::error!("Upstream API key is not configured");
            return Err(UpstreamError::AuthConfig);
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(key)
            .json(request)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_transport(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = status.as_u16(),
                body = %truncate_for_log(&body, 200),
                "Upstream returned an error"
            );
            return Err(match status.as_u16() {
                401 => UpstreamError::AuthConfig,
                429 => UpstreamError::RateLimited,
                other => UpstreamError::Unavailable { status: other },
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_transport(e, timeout))?;

        let parsed: CompletionResponse = match serde_json::from_slice(&bytes) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %truncate_for_log(&String::from_utf8_lossy(&bytes), 200),
                    "Upstream returned an unreadable body"
                );
                return Err(UpstreamError::EmptyResponse);
            }
        };

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(UpstreamError::EmptyResponse)
    }
}

fn classify_transport(err: reqwest::Error, timeout: Duration) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Timeout(timeout)
    } else {
        UpstreamError::Network(err.to_string())
    }
}
