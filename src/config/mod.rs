//! Configuration for the relay server
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/advice-relay/config.toml)
//! 3. Built-in defaults (lowest priority)

use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod cors;
mod limits;
mod observability;
mod serialization;
mod upstream;


// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (maintain public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use cors::{Cors, FileCors};
pub use limits::{FileRateLimit, RateLimit};
pub use observability::{FileLogging, LogRotation, LoggingConfig};
pub use upstream::{FileUpstream, UpstreamConfig};

use crate::relay::prompt::DEFAULT_SYSTEM_PROMPT;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_ENVIRONMENT: &str = "development";

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the relay server to
    pub bind_addr: SocketAddr,

    /// Deployment environment name; `production` selects the production CORS list
    pub environment: String,

    /// System instruction prepended to every conversation
    pub system_prompt: String,

    /// Upstream provider settings
    pub upstream: UpstreamConfig,

    /// Per-client rate limiting
    pub rate_limit: RateLimit,

    /// Cross-origin allow-lists
    pub cors: Cors,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            upstream: UpstreamConfig::default(),
            rate_limit: RateLimit::default(),
            cors: Cors::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// CORS origins for the configured environment
    pub fn allowed_origins(&self) -> &[String] {
        self.cors.origins_for(&self.environment)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

/// Config file structure
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub bind_addr: Option<String>,
    pub environment: Option<String>,
    pub system_prompt: Option<String>,

    /// Optional [upstream] section
    pub upstream: Option<FileUpstream>,

    /// Optional [rate_limit] section
    pub rate_limit: Option<FileRateLimit>,

    /// Optional [cors] section
    pub cors: Option<FileCors>,

    /// Optional [logging] section
    pub logging: Option<FileLogging>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Get the config file path: ~/.config/advice-relay/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| {
            p.join(".config")
                .join("advice-relay")
                .join("config.toml")
        })
    }

    /// Create config file with defaults if it doesn't exist
    /// Called during startup to help operators discover configuration options
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };

        // Don't overwrite existing config
        if path.exists() {
            return;
        }

        // Create parent directory
        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return; // Silently fail - config is optional
            }
        }

        // Use Config::default().to_toml() as single source of truth
        let _ = std::fs::write(&path, Self::default().to_toml());
    }

    /// Load file config if it exists
    ///
    /// A missing file means defaults. A file that exists but cannot be read
    /// or parsed is an error: a broken config should fail fast instead of
    /// silently falling back to defaults.
    fn load_file_config() -> Result<FileConfig> {
        let Some(path) = Self::config_path() else {
            return Ok(FileConfig::default());
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
            Err(e) => Err(e)
                .with_context(|| format!("Cannot read config file {}", path.display())),
        }
    }

    /// Load configuration: env vars -> file -> defaults
    pub fn from_env() -> Result<Self> {
        let file = Self::load_file_config()?;
        Self::resolve(file, |name| std::env::var(name).ok())
    }

    /// Merge a parsed config file with environment lookups
    ///
    /// `env` is injected so tests can resolve without touching the process
    /// environment.
    pub(crate) fn resolve<F>(file: FileConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let env = |name: &str| env(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        // Bind address: env > file > default
        let mut bind_addr = match env("RELAY_BIND").or(file.bind_addr) {
            Some(raw) => raw
                .parse::<SocketAddr>()
                .with_context(|| format!("Invalid bind address: {raw:?}"))?,
            None => defaults.bind_addr,
        };

        // PORT only replaces the port (common PaaS convention)
        if let Some(port) = parse_env::<u16>(&env, "PORT")? {
            bind_addr.set_port(port);
        }

        let environment = env("RELAY_ENV")
            .or(file.environment)
            .unwrap_or(defaults.environment);

        let system_prompt = file.system_prompt.unwrap_or(defaults.system_prompt);

        // Subconfig loading with from_file() helpers, then env overrides
        let mut upstream = UpstreamConfig::from_file(file.upstream);
        if let Some(url) = env("UPSTREAM_BASE_URL") {
            upstream.base_url = url;
        }
        if let Some(key) = env("UPSTREAM_API_KEY") {
            upstream.api_key = Some(key);
        }
        if let Some(model) = env("UPSTREAM_MODEL") {
            upstream.model = model;
        }
        if let Some(ms) = parse_env::<u64>(&env, "UPSTREAM_TIMEOUT_MS")? {
            upstream.timeout = Duration::from_millis(ms);
        }

        let mut rate_limit = RateLimit::from_file(file.rate_limit);
        if let Some(secs) = parse_env::<u64>(&env, "RATE_LIMIT_WINDOW_SECS")? {
            rate_limit.window = Duration::from_secs(secs);
        }
        if let Some(max) = parse_env::<usize>(&env, "RATE_LIMIT_MAX_REQUESTS")? {
            rate_limit.max_requests = max;
        }
        if let Some(trust) = env_bool(&env, "RELAY_TRUST_FORWARDED_FOR")? {
            rate_limit.trust_forwarded_for = trust;
        }

        let cors = Cors::from_file(file.cors);
        let logging = LoggingConfig::from_file(file.logging)?;

        Ok(Self {
            bind_addr,
            environment,
            system_prompt,
            upstream,
            rate_limit,
            cors,
            logging,
        })
    }
}

/// Parse a numeric env var, failing loudly on garbage
fn parse_env<T>(env: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env(name)
        .map(|raw| {
            raw.parse::<T>()
                .with_context(|| format!("Invalid value for {name}: {raw:?}"))
        })
        .transpose()
}

fn env_bool(env: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<bool>> {
    let Some(raw) = env(name) else {
        return Ok(None);
    };

    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => anyhow::bail!("Invalid boolean value for {name}: {raw:?} (expected true/false)"),
    }
}
