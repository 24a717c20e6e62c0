//! Configuration schema for gfo
//!
//! Configuration is stored at `~/.config/gfo/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Font cache settings
    pub cache: CacheConfig,

    /// Upstream font API settings
    pub upstream: UpstreamConfig,

    /// Worker leader election settings
    pub election: ElectionConfig,

    /// Background service settings
    pub services: ServicesConfig,

    /// Logging settings
    pub log: LogConfig,
}

impl Config {
    /// Look up a single value by section and key (e.g. `cache`, `ttl_seconds`)
    pub fn get(&self, section: &str, key: &str) -> Option<toml::Value> {
        let value = toml::Value::try_from(self).ok()?;
        value.get(section)?.get(key).cloned()
    }
}

/// Font cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds until a cached stylesheet or font file expires
    pub ttl_seconds: u64,

    /// Directory shared by all workers for cached files
    pub directory: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 3600,
            directory: std::env::temp_dir().join("gfo-fonts"),
        }
    }
}

/// Upstream font API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the legacy stylesheet API
    pub css_url: String,

    /// Base URL of the modern stylesheet API
    pub css2_url: String,

    /// Timeout for a single fetch in seconds
    pub timeout_secs: u64,

    /// User-Agent sent upstream (the API picks font formats by it)
    pub user_agent: Option<String>,

    /// Largest response body accepted
    pub max_body_bytes: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            css_url: "https://fonts.googleapis.com/css".to_string(),
            css2_url: "https://fonts.googleapis.com/css2".to_string(),
            timeout_secs: 30,
            user_agent: None,
            max_body_bytes: 32 * 1024 * 1024,
        }
    }
}

/// Leader election configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectionConfig {
    /// Give up waiting for the full roster after N seconds (0 = wait forever)
    pub timeout_secs: u64,

    /// Upper bound of the randomized delay between roster checks
    pub max_backoff_ms: u64,

    /// Drop marker files of processes that are no longer alive
    pub prune_stale: bool,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            max_backoff_ms: 1000,
            prune_stale: true,
        }
    }
}

/// Background service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Seconds between cache cleanup runs
    pub cache_cleanup_interval_secs: u64,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            cache_cleanup_interval_secs: 60,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default level when no -v flag or RUST_LOG is given
    pub level: String,

    /// Output format: "text" or "json"
    pub format: LogFormat,

    /// Optional log file shared by all workers
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            file: None,
        }
    }
}
