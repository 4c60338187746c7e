//! Configuration management
//!
//! Configuration is loaded from a config.yml file with environment-variable
//! overrides. Missing optional values are filled with sensible defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// ML predictor configuration
    #[serde(default)]
    pub predictor: PredictorConfig,
}

impl Config {
    /// Load configuration from a YAML file, falling back to defaults when the
    /// file is absent. Environment variables override file settings.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config: Config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("LACTRON_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("LACTRON_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(origin) = std::env::var("LACTRON_CORS_ORIGIN") {
            self.server.cors_origin = origin;
        }
        if let Ok(url) = std::env::var("LACTRON_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(url) = std::env::var("LACTRON_PREDICTOR_URL") {
            self.predictor.url = url;
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (for cookie-based auth)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8083
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path or URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/lactron.db".to_string()
}

/// ML predictor endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// Prediction endpoint URL
    #[serde(default = "default_predictor_url")]
    pub url: String,
    /// Request timeout in seconds; exceeding it selects the fallback heuristic
    #[serde(default = "default_predictor_timeout")]
    pub timeout_secs: u64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            url: default_predictor_url(),
            timeout_secs: default_predictor_timeout(),
        }
    }
}

fn default_predictor_url() -> String {
    "http://localhost:5000/predict".to_string()
}

fn default_predictor_timeout() -> u64 {
    5
}
