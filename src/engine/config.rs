//! Engine configuration
//!
//! Loaded from a JSON file; every field is optional:
//!
//! ```json
//! { "max_depth": 32, "reject_unknown_keys": false, "log_level": "warn" }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::schema::{ModelError, ModelResult};

/// Configuration of an [`Engine`](super::Engine)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of nested models entered by one load or dump
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Reject wire keys that no property declares
    #[serde(default)]
    pub reject_unknown_keys: bool,

    /// Default log filter for the binary when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_max_depth() -> usize {
    32
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            reject_unknown_keys: false,
            log_level: default_log_level(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> ModelResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| ModelError::config(format!("Failed to read config: {}", e)))?;
        Self::from_json_str(&content)
    }

    /// Parse configuration from a JSON string
    pub fn from_json_str(content: &str) -> ModelResult<Self> {
        let config: EngineConfig = serde_json::from_str(content)
            .map_err(|e| ModelError::config(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Config with unknown-key rejection enabled
    pub fn strict() -> Self {
        Self {
            reject_unknown_keys: true,
            ..Self::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parsed `log_level`
    pub fn level_filter(&self) -> ModelResult<LevelFilter> {
        self.log_level
            .parse::<LevelFilter>()
            .map_err(|_| ModelError::config(format!("Invalid log_level: '{}'", self.log_level)))
    }

    fn validate(&self) -> ModelResult<()> {
        if self.max_depth == 0 {
            return Err(ModelError::config("max_depth must be at least 1"));
        }
        self.level_filter()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_depth, 32);
        assert!(!config.reject_unknown_keys);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_depth": 4, "reject_unknown_keys": true, "log_level": "debug"}}"#).unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.max_depth, 4);
        assert!(config.reject_unknown_keys);
        assert_eq!(config.level_filter().unwrap(), LevelFilter::DEBUG);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert_eq!(err.code(), "APIMODEL_CONFIG");
    }

    #[test]
    fn test_zero_depth_rejected() {
        let err = EngineConfig::from_json_str(r#"{"max_depth": 0}"#).unwrap_err();
        assert!(err.message().contains("max_depth"));
    }

    #[test]
    fn test_bad_log_level_rejected() {
        let err = EngineConfig::from_json_str(r#"{"log_level": "loud"}"#).unwrap_err();
        assert!(err.message().contains("log_level"));
    }

    #[test]
    fn test_strict() {
        assert!(EngineConfig::strict().reject_unknown_keys);
        assert_eq!(EngineConfig::strict().with_max_depth(2).max_depth, 2);
    }
}
