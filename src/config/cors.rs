//! Cross-origin allow-lists per environment

use serde::Deserialize;

/// Environment name that selects the production allow-list
pub const PRODUCTION: &str = "production";

/// CORS allow-lists
#[derive(Debug, Clone)]
pub struct Cors {
    /// Origins allowed in every non-production environment
    pub development_origins: Vec<String>,
    /// Origins allowed when the environment is `production`
    pub production_origins: Vec<String>,
}

impl Default for Cors {
    fn default() -> Self {
        Self {
            development_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:5174".to_string(),
            ],
            production_origins: vec!["https://your-domain.com".to_string()],
        }
    }
}

/// CORS settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileCors {
    pub development_origins: Option<Vec<String>>,
    pub production_origins: Option<Vec<String>>,
}

impl Cors {
    /// Create from file config with defaults
    pub fn from_file(file: Option<FileCors>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            development_origins: file
                .development_origins
                .unwrap_or(defaults.development_origins),
            production_origins: file
                .production_origins
                .unwrap_or(defaults.production_origins),
        }
    }

    /// Allow-list for the given environment name
    pub fn origins_for(&self, environment: &str) -> &[String] {
        if environment.eq_ignore_ascii_case(PRODUCTION) {
            &self.production_origins
        } else {
            &self.development_origins
        }
    }
}
