//! Pipeline configuration sections
//!
//! The CLI layers these from defaults, a TOML file and the environment.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Metadata store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database URL (`postgres://…` in production, `sqlite:…` in tests)
    pub url: String,
    /// Collection whose bitstreams are validated
    pub collection_id: i64,
    pub max_connections: u32,
    pub connect_timeout_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "postgres://dspace@localhost/dspace".to_string(),
            collection_id: 1,
            max_connections: 2,
            connect_timeout_seconds: 30,
        }
    }
}

impl StoreConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

/// External validator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    pub executable: PathBuf,
    /// Per-invocation limit; `0` waits forever
    pub timeout_seconds: u64,
    /// Passed to every invocation ahead of the mode flag
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("jhove"),
            timeout_seconds: 600,
            extra_args: Vec::new(),
        }
    }
}

impl ValidatorConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_seconds > 0).then(|| Duration::from_secs(self.timeout_seconds))
    }
}

/// Where assets are read from and reports written to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub asset_root: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("/dspace/assetstore"),
            output_dir: PathBuf::from("jhove-reports"),
        }
    }
}

/// Everything a run needs besides the store connection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub validator: ValidatorConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl PipelineConfig {
    /// Reject settings that would make every item fail
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.url.trim().is_empty() {
            return Err(ConfigError::missing("store.url"));
        }
        if self.store.max_connections == 0 {
            return Err(ConfigError::invalid(
                "store.max_connections must be greater than 0",
            ));
        }
        if self.validator.executable.as_os_str().is_empty() {
            return Err(ConfigError::missing("validator.executable"));
        }
        if self.storage.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::missing("storage.output_dir"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_disables_limit() {
        let config = ValidatorConfig {
            timeout_seconds: 0,
            ..Default::default()
        };
        assert_eq!(config.timeout(), None);
        assert_eq!(
            ValidatorConfig::default().timeout(),
            Some(Duration::from_secs(600))
        );
    }

    #[test]
    fn test_empty_url_is_rejected() {
        let mut config = PipelineConfig::default();
        config.store.url = "  ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_zero_connections_is_rejected() {
        let mut config = PipelineConfig::default();
        config.store.max_connections = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }
}
