//! Configuration - Type-safe, validated config
//!
//! Loads from `config.toml`; every field has a default so the file is optional.
//! REST credentials fall back to `BITSO_API_KEY` / `BITSO_API_SECRET`.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::core::{Error, Result};

pub const DEFAULT_WS_ENDPOINT: &str = "wss://ws.bitso.com";
pub const DEFAULT_REST_ENDPOINT: &str = "https://api.bitso.com";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Streaming feed settings
    #[serde(default)]
    pub feed: FeedConfig,

    /// REST collaborator settings
    #[serde(default)]
    pub rest: RestConfig,

    /// Log level used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_ws_endpoint")]
    pub endpoint: String,

    /// Delivery queue capacity; overflow disconnects
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_keepalive_interval_ms")]
    pub keepalive_interval_ms: u64,

    /// Upper bound on waiting for the close frame before dropping the socket
    #[serde(default = "default_close_grace_ms")]
    pub close_grace_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestConfig {
    #[serde(default = "default_rest_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    pub api_key: Option<String>,

    pub api_secret: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_ws_endpoint() -> String {
    DEFAULT_WS_ENDPOINT.to_string()
}
fn default_queue_capacity() -> usize {
    1000
}
fn default_keepalive_interval_ms() -> u64 {
    1000
}
fn default_close_grace_ms() -> u64 {
    1000
}
fn default_rest_endpoint() -> String {
    DEFAULT_REST_ENDPOINT.to_string()
}
fn default_timeout_secs() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            rest: RestConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: default_ws_endpoint(),
            queue_capacity: default_queue_capacity(),
            keepalive_interval_ms: default_keepalive_interval_ms(),
            close_grace_ms: default_close_grace_ms(),
        }
    }
}

impl FeedConfig {
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }

    pub fn close_grace(&self) -> Duration {
        Duration::from_millis(self.close_grace_ms)
    }
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            endpoint: default_rest_endpoint(),
            timeout_secs: default_timeout_secs(),
            api_key: None,
            api_secret: None,
        }
    }
}

impl RestConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Key/secret pair, if both are set
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.api_key.as_deref(), self.api_secret.as_deref()) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Some((key, secret))
            }
            _ => None,
        }
    }
}

impl Config {
    /// Load from TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        Self::parse(&content)
    }

    /// Parse TOML content and validate it
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `config.toml` from the working directory, falling back to defaults,
    /// then fill missing credentials from the environment.
    pub fn load_default() -> Self {
        dotenv::dotenv().ok();

        let mut config = match Self::load(Path::new("config.toml")) {
            Ok(cfg) => {
                tracing::info!("Loaded config from config.toml");
                cfg
            }
            Err(e) => {
                tracing::warn!("No usable config.toml ({}), using defaults", e);
                Self::default()
            }
        };

        config.apply_env();
        config
    }

    /// Fill credentials missing from the file with environment values
    pub fn apply_env(&mut self) {
        if self.rest.api_key.is_none() {
            self.rest.api_key = std::env::var("BITSO_API_KEY").ok();
        }
        if self.rest.api_secret.is_none() {
            self.rest.api_secret = std::env::var("BITSO_API_SECRET").ok();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.feed.queue_capacity == 0 {
            return Err(Error::Config("feed.queue_capacity must be > 0".to_string()));
        }
        if self.feed.keepalive_interval_ms == 0 {
            return Err(Error::Config(
                "feed.keepalive_interval_ms must be > 0".to_string(),
            ));
        }
        url::Url::parse(&self.feed.endpoint)
            .map_err(|e| Error::Config(format!("feed.endpoint: {}", e)))?;
        url::Url::parse(&self.rest.endpoint)
            .map_err(|e| Error::Config(format!("rest.endpoint: {}", e)))?;
        Ok(())
    }
}
