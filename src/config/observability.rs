//! Logging configuration: level, file output, rotation
//!
//! Values are checked when the file is loaded. An unknown level or rotation
//! is a startup error rather than a silent fallback.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::Level;

/// Log file rotation strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Hourly,
    #[default]
    Daily,
    /// Single file, never rotated
    Never,
}

impl LogRotation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Never => "never",
        }
    }
}

/// Console and file logging
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default level for this crate and tower-http; `RUST_LOG` wins over it
    pub level: Level,
    /// Also write JSON lines to rolling files
    pub file_enabled: bool,
    pub file_dir: PathBuf,
    pub file_rotation: LogRotation,
    /// File name prefix, e.g. "advice-relay" -> "advice-relay.2024-01-15"
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            file_enabled: false,
            file_dir: PathBuf::from("./logs"),
            file_rotation: LogRotation::Daily,
            file_prefix: "advice-relay".to_string(),
        }
    }
}

/// [logging] section as written in the config file
#[derive(Debug, Deserialize, Default)]
pub struct FileLogging {
    pub level: Option<String>,
    pub file_enabled: Option<bool>,
    pub file_dir: Option<PathBuf>,
    pub file_rotation: Option<LogRotation>,
    pub file_prefix: Option<String>,
}

impl LoggingConfig {
    /// Apply the file section over the defaults
    pub fn from_file(file: Option<FileLogging>) -> Result<Self> {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        let level = match file.level {
            Some(raw) => raw
                .trim()
                .parse::<Level>()
                .with_context(|| format!("Invalid [logging].level: {raw:?}"))?,
            None => defaults.level,
        };

        Ok(Self {
            level,
            file_enabled: file.file_enabled.unwrap_or(defaults.file_enabled),
            file_dir: file.file_dir.unwrap_or(defaults.file_dir),
            file_rotation: file.file_rotation.unwrap_or(defaults.file_rotation),
            file_prefix: file.file_prefix.unwrap_or(defaults.file_prefix),
        })
    }

    /// Level name as written in config files and filter directives
    pub fn level_name(&self) -> String {
        self.level.as_str().to_ascii_lowercase()
    }
}
