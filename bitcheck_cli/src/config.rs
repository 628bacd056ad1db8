use crate::paths;
use anyhow::{Context, Result};
use bitcheck_core::{PipelineConfig, StorageConfig, StoreConfig, ValidatorConfig};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Prefix of environment overrides, e.g. `BITCHECK_STORE__URL`
pub const ENV_PREFIX: &str = "BITCHECK_";

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub validator: ValidatorConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    /// `human`, `json` or `auto` (human on a terminal, json otherwise)
    pub default_format: String,
    pub color_enabled: bool,
    pub progress_enabled: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: "auto".to_string(),
            color_enabled: true,
            progress_enabled: true,
        }
    }
}

/// Settings given on the command line for a single run
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub collection_id: Option<i64>,
    pub store_url: Option<String>,
    pub validator: Option<PathBuf>,
    pub asset_root: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub timeout_seconds: Option<u64>,
}

impl AppConfig {
    /// Apply CLI argument overrides to the configuration
    pub fn apply_cli_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(id) = overrides.collection_id {
            self.store.collection_id = id;
        }
        if let Some(url) = &overrides.store_url {
            self.store.url = url.clone();
        }
        if let Some(executable) = &overrides.validator {
            self.validator.executable = executable.clone();
        }
        if let Some(root) = &overrides.asset_root {
            self.storage.asset_root = root.clone();
        }
        if let Some(dir) = &overrides.output_dir {
            self.storage.output_dir = dir.clone();
        }
        if let Some(seconds) = overrides.timeout_seconds {
            self.validator.timeout_seconds = seconds;
        }
    }

    /// The sections the core pipeline consumes
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            store: self.store.clone(),
            validator: self.validator.clone(),
            storage: self.storage.clone(),
        }
    }
}

/// Configuration manager that handles XDG-compliant paths and layered configuration
pub struct ConfigManager {
    config_path: PathBuf,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    /// Create a new ConfigManager with default XDG-compliant paths
    pub fn new() -> Self {
        Self {
            config_path: paths::get_config_path(),
        }
    }

    /// Create a ConfigManager with a specific path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the configuration file path
    pub fn get_config_path(&self) -> PathBuf {
        self.config_path.clone()
    }

    /// Load configuration with layered priority: ENV > File > Defaults
    ///
    /// CLI flags are applied afterwards with [`AppConfig::apply_cli_overrides`].
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new();

        // Layer 1: Defaults
        figment = figment.merge(Serialized::defaults(AppConfig::default()));

        // Layer 2: Config file (if exists)
        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        }

        // Layer 3: Environment variables
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment.extract().context("Failed to load configuration")
    }

    /// Get a configuration value by key (dot notation)
    pub fn get(&self, key: &str) -> Result<String> {
        let value = Self::as_toml(&self.load()?)?;

        let mut current = &value;
        for part in key.split('.') {
            match current {
                toml::Value::Table(table) => {
                    current = table
                        .get(part)
                        .ok_or_else(|| anyhow::anyhow!("Key '{}' not found", key))?;
                }
                _ => anyhow::bail!("Invalid key path: {}", key),
            }
        }

        Self::render_value(current)
            .ok_or_else(|| anyhow::anyhow!("Value at '{}' is not a simple type", key))
    }

    /// Set a configuration value by key (dot notation)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.validate_config_value(key, value)?;

        let mut config = if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)?;
            toml::from_str(&content)?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        let parts: Vec<&str> = key.split('.').collect();
        let Some((last, sections)) = parts.split_last() else {
            anyhow::bail!("Empty key");
        };

        let mut current = &mut config;
        for part in sections {
            let toml::Value::Table(table) = current else {
                anyhow::bail!("Invalid key path: expected table at '{}'", part);
            };
            current = table
                .entry(part.to_string())
                .or_insert(toml::Value::Table(toml::map::Map::new()));
        }

        let toml::Value::Table(table) = current else {
            anyhow::bail!("Cannot set value on non-table");
        };
        table.insert(last.to_string(), self.parse_config_value(key, value)?);

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(&config)?;
        fs::write(&self.config_path, toml_string)?;

        Ok(())
    }

    /// List all configuration values
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        let value = Self::as_toml(&self.load()?)?;

        let mut items = Vec::new();
        Self::collect_values(&value, String::new(), &mut items);
        items.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(items)
    }

    fn as_toml(config: &AppConfig) -> Result<toml::Value> {
        let toml_string = toml::to_string(config)?;
        Ok(toml::from_str(&toml_string)?)
    }

    /// Recursively collect all key-value pairs from TOML
    fn collect_values(value: &toml::Value, prefix: String, items: &mut Vec<(String, String)>) {
        match value {
            toml::Value::Table(table) => {
                for (key, val) in table {
                    let new_prefix = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}.{key}")
                    };
                    Self::collect_values(val, new_prefix, items);
                }
            }
            other => {
                if let Some(rendered) = Self::render_value(other) {
                    items.push((prefix, rendered));
                }
            }
        }
    }

    /// Render a leaf value; string arrays are joined with spaces
    fn render_value(value: &toml::Value) -> Option<String> {
        match value {
            toml::Value::String(s) => Some(s.clone()),
            toml::Value::Integer(i) => Some(i.to_string()),
            toml::Value::Float(f) => Some(f.to_string()),
            toml::Value::Boolean(b) => Some(b.to_string()),
            toml::Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(|parts| parts.join(" ")),
            _ => None,
        }
    }

    /// Validate a configuration value
    fn validate_config_value(&self, key: &str, value: &str) -> Result<()> {
        match key {
            "store.url" => {
                if value.trim().is_empty() {
                    anyhow::bail!("url must not be empty");
                }
            }
            "store.collection_id" => {
                let _: i64 = value.parse().context("collection_id must be an integer")?;
            }
            "store.max_connections" => {
                let count: u32 = value
                    .parse()
                    .context("max_connections must be a positive integer")?;
                if count == 0 {
                    anyhow::bail!("max_connections must be greater than 0");
                }
            }
            "store.connect_timeout_seconds" => {
                let timeout: u64 = value
                    .parse()
                    .context("connect_timeout_seconds must be a positive integer")?;
                if timeout == 0 {
                    anyhow::bail!("connect_timeout_seconds must be greater than 0");
                }
            }
            "validator.timeout_seconds" => {
                let _: u64 = value
                    .parse()
                    .context("timeout_seconds must be a non-negative integer (0 disables)")?;
            }
            "validator.executable" | "storage.asset_root" | "storage.output_dir" => {
                if value.trim().is_empty() {
                    anyhow::bail!("{key} must not be empty");
                }
            }
            "output.default_format" => {
                if !matches!(value, "human" | "json" | "auto") {
                    anyhow::bail!("default_format must be one of: human, json, auto");
                }
            }
            "output.color_enabled" | "output.progress_enabled" => {
                let _: bool = value.parse().context("Value must be 'true' or 'false'")?;
            }
            _ => {} // No validation for unknown keys
        }
        Ok(())
    }

    /// Parse a value to the appropriate TOML type
    fn parse_config_value(&self, key: &str, value: &str) -> Result<toml::Value> {
        match key {
            "validator.extra_args" => Ok(toml::Value::Array(
                value
                    .split_whitespace()
                    .map(|arg| toml::Value::String(arg.to_string()))
                    .collect(),
            )),
            k if k.ends_with("_seconds") || k.ends_with("_id") || k.ends_with("_connections") => {
                let num: i64 = value.parse().context("Expected integer value")?;
                Ok(toml::Value::Integer(num))
            }
            k if k.ends_with("_enabled") => {
                let bool_val: bool = value
                    .parse()
                    .context("Expected boolean value (true/false)")?;
                Ok(toml::Value::Boolean(bool_val))
            }
            // Paths, URLs and names stay strings even when they look numeric
            "store.url" | "validator.executable" | "storage.asset_root" | "storage.output_dir"
            | "output.default_format" => Ok(toml::Value::String(value.to_string())),
            _ => {
                if let Ok(b) = value.parse::<bool>() {
                    Ok(toml::Value::Boolean(b))
                } else if let Ok(i) = value.parse::<i64>() {
                    Ok(toml::Value::Integer(i))
                } else if let Ok(f) = value.parse::<f64>() {
                    Ok(toml::Value::Float(f))
                } else {
                    Ok(toml::Value::String(value.to_string()))
                }
            }
        }
    }
}

/// Load configuration from the default location
pub fn get_config() -> Result<AppConfig> {
    ConfigManager::new().load()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.store.url, "postgres://dspace@localhost/dspace");
        assert_eq!(config.store.collection_id, 1);
        assert_eq!(config.validator.timeout_seconds, 600);
        assert_eq!(config.output.default_format, "auto");
        assert!(config.pipeline().validate().is_ok());
    }

    #[test]
    fn test_overrides_replace_only_given_fields() {
        let mut config = AppConfig::default();
        config.apply_cli_overrides(&ConfigOverrides {
            collection_id: Some(9),
            timeout_seconds: Some(0),
            ..ConfigOverrides::default()
        });

        assert_eq!(config.store.collection_id, 9);
        assert_eq!(config.validator.timeout(), None);
        assert_eq!(config.store.url, StoreConfig::default().url);
    }

    #[test]
    fn test_parse_extra_args_as_array() {
        let manager = ConfigManager::with_path(PathBuf::from("unused.toml"));
        let value = manager
            .parse_config_value("validator.extra_args", "-c /etc/jhove.conf")
            .unwrap();
        assert_eq!(
            value,
            toml::Value::Array(vec![
                toml::Value::String("-c".to_string()),
                toml::Value::String("/etc/jhove.conf".to_string()),
            ])
        );
    }

    #[test]
    fn test_numeric_looking_paths_stay_strings() {
        let manager = ConfigManager::with_path(PathBuf::from("unused.toml"));
        let value = manager
            .parse_config_value("storage.output_dir", "2024")
            .unwrap();
        assert_eq!(value, toml::Value::String("2024".to_string()));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let manager = ConfigManager::with_path(PathBuf::from("unused.toml"));
        assert!(manager.validate_config_value("store.max_connections", "0").is_err());
        assert!(manager.validate_config_value("store.collection_id", "abc").is_err());
        assert!(manager.validate_config_value("output.default_format", "csv").is_err());
        assert!(manager.validate_config_value("validator.timeout_seconds", "0").is_ok());
    }
}
