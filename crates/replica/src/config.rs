//! Cluster configuration, persisted as `config.json` in a data directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the configuration file inside a data directory.
pub const CONFIG_FILE: &str = "config.json";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Settings for a local replica cluster and the clients talking to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Number of replicas (`n`). Tolerates `(n - 1) / 3` faulty ones.
    pub replicas: usize,
    /// How long a client waits for a reply quorum, in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            replicas: 4,
            request_timeout_ms: 2_000,
        }
    }
}

impl ClusterConfig {
    /// Create a configuration with the given replica count.
    pub fn new(replicas: usize, request_timeout_ms: u64) -> Self {
        Self {
            replicas,
            request_timeout_ms,
        }
    }

    /// Maximum number of faulty replicas tolerated (`f`).
    pub fn fault_tolerance(&self) -> usize {
        self.replicas.saturating_sub(1) / 3
    }

    /// Matching replies needed to accept an ordered result (`f + 1`).
    pub fn reply_quorum(&self) -> usize {
        self.fault_tolerance() + 1
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.replicas == 0 {
            return Err(ConfigError::Invalid("at least one replica is required".into()));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid("request timeout must be positive".into()));
        }
        Ok(())
    }

    /// Load `config.json` from a data directory.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `config.json` if present, otherwise fall back to defaults.
    pub fn load_or_default(data_dir: &Path) -> Result<Self> {
        if data_dir.join(CONFIG_FILE).exists() {
            Self::load(data_dir)
        } else {
            Ok(Self::default())
        }
    }

    /// Write `config.json` into a data directory, creating it if needed.
    pub fn save(&self, data_dir: &Path) -> Result<PathBuf> {
        self.validate()?;
        fs::create_dir_all(data_dir).map_err(|source| ConfigError::Io {
            path: data_dir.to_path_buf(),
            source,
        })?;
        let path = data_dir.join(CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(self)?).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClusterConfig::default();
        assert_eq!(config.replicas, 4);
        assert_eq!(config.fault_tolerance(), 1);
        assert_eq!(config.reply_quorum(), 2);
        assert_eq!(config.request_timeout(), Duration::from_secs(2));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fault_tolerance() {
        assert_eq!(ClusterConfig::new(1, 100).fault_tolerance(), 0);
        assert_eq!(ClusterConfig::new(3, 100).fault_tolerance(), 0);
        assert_eq!(ClusterConfig::new(7, 100).fault_tolerance(), 2);
        assert_eq!(ClusterConfig::new(10, 100).reply_quorum(), 4);
    }

    #[test]
    fn test_validate() {
        assert!(ClusterConfig::new(0, 100).validate().is_err());
        assert!(ClusterConfig::new(4, 0).validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClusterConfig::new(7, 500);

        let path = config.save(dir.path()).unwrap();
        assert!(path.ends_with(CONFIG_FILE));

        let loaded = ClusterConfig::load(dir.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClusterConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config, ClusterConfig::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), r#"{ "replicas": 7 }"#).unwrap();

        let config = ClusterConfig::load(dir.path()).unwrap();
        assert_eq!(config.replicas, 7);
        assert_eq!(config.request_timeout_ms, 2_000);
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "not json").unwrap();
        assert!(matches!(
            ClusterConfig::load(dir.path()),
            Err(ConfigError::Json(_))
        ));
    }
}
