//! Upstream provider configuration
//!
//! Where chat completions are sent and with which sampling parameters.

use serde::Deserialize;
use std::time::Duration;

/// Upstream chat-completion provider
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Provider base URL, without the completion path
    pub base_url: String,
    /// Completion path appended to `base_url`
    pub path: String,
    /// Bearer token; `None` fails every chat request with a config error
    pub api_key: Option<String>,
    /// Model identifier sent with every request
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Per-request deadline, covering connect through body read
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepseek.com".to_string(),
            path: "/v1/chat/completions".to_string(),
            api_key: None,
            model: "deepseek-chat".to_string(),
            max_tokens: 800,
            temperature: 0.7,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Upstream settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileUpstream {
    pub base_url: Option<String>,
    pub path: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_ms: Option<u64>,
}

impl UpstreamConfig {
    /// Create from file config with defaults
    pub fn from_file(file: Option<FileUpstream>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            base_url: file.base_url.unwrap_or(defaults.base_url),
            path: file.path.unwrap_or(defaults.path),
            api_key: file.api_key.or(defaults.api_key),
            model: file.model.unwrap_or(defaults.model),
            max_tokens: file.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: file.temperature.unwrap_or(defaults.temperature),
            timeout: file
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.timeout),
        }
    }
}
