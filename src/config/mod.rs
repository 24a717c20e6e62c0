//! Configuration management for gfo

pub mod schema;

pub use schema::{
    CacheConfig, Config, ElectionConfig, LogConfig, LogFormat, ServicesConfig, UpstreamConfig,
};

use crate::error::{GfoError, GfoResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
    /// Set for explicitly chosen files, which must exist
    required: bool,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
            required: false,
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            config_path: path,
            required: true,
        }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gfo")
            .join("config.toml")
    }

    /// Load configuration, falling back to defaults if the default file
    /// does not exist
    pub async fn load(&self) -> GfoResult<Config> {
        if !self.config_path.exists() {
            if self.required {
                return Err(GfoError::ConfigNotFound(self.config_path.clone()));
            }
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> GfoResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| GfoError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| GfoError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> GfoResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            GfoError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> GfoResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| GfoError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn explicit_missing_file_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nonexistent.toml");
        let manager = ConfigManager::with_path(path.clone());

        let err = manager.load().await.unwrap_err();
        assert!(matches!(err, GfoError::ConfigNotFound(p) if p == path));
    }

    #[tokio::test]
    async fn default_location_missing_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager {
            config_path: temp.path().join("config.toml"),
            required: false,
        };

        let config = manager.load().await.unwrap();
        assert_eq!(config.cache.ttl_seconds, 3600);
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let manager = ConfigManager::with_path(path);

        let mut config = Config::default();
        config.cache.ttl_seconds = 120;
        config.upstream.user_agent = Some("gfo-test".to_string());

        manager.save(&config).await.unwrap();
        let loaded = manager.load().await.unwrap();

        assert_eq!(loaded.cache.ttl_seconds, 120);
        assert_eq!(loaded.upstream.user_agent.as_deref(), Some("gfo-test"));
    }

    #[tokio::test]
    async fn invalid_file_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[cache]\nttl_seconds = \"soon\"\n").unwrap();

        let err = ConfigManager::with_path(path.clone()).load().await.unwrap_err();
        match err {
            GfoError::ConfigInvalid { path: p, .. } => assert_eq!(p, path),
            other => panic!("expected ConfigInvalid, got {:?}", other),
        }
    }
}
