//! Board Configuration
//!
//! Engine tunables and remote store settings, loadable from JSON.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::entity::{DomainError, DomainResult};

/// Engine tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Quiet period before buffered updates for a task are sent
    pub debounce_ms: u64,
    /// Number of undo snapshots kept
    pub history_capacity: usize,
    /// Prefix of locally minted task ids
    pub temp_id_prefix: String,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            history_capacity: 20,
            temp_id_prefix: "temp-".to_string(),
        }
    }
}

impl BoardConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn from_json_str(json: &str) -> DomainResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| DomainError::InvalidInput(format!("board config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> DomainResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| DomainError::InvalidInput(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.history_capacity == 0 {
            return Err(DomainError::InvalidInput(
                "history_capacity must be at least 1".to_string(),
            ));
        }
        if self.temp_id_prefix.is_empty() {
            return Err(DomainError::InvalidInput("temp_id_prefix must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Remote store endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub url: String,
    #[serde(default)]
    pub token: String,
}

impl RemoteConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
        }
    }

    pub fn from_json_str(json: &str) -> DomainResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| DomainError::InvalidInput(format!("remote config: {}", e)))?;
        if config.url.trim().is_empty() {
            return Err(DomainError::InvalidInput("remote url must not be empty".to_string()));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BoardConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(500));
        assert_eq!(config.history_capacity, 20);
        assert_eq!(config.temp_id_prefix, "temp-");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = BoardConfig::from_json_str(r#"{ "debounce_ms": 250 }"#).unwrap();
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.history_capacity, 20);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = BoardConfig::from_json_str(r#"{ "history_capacity": 0 }"#).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.json");
        std::fs::write(&path, r#"{ "temp_id_prefix": "local-" }"#).unwrap();

        let config = BoardConfig::load(&path).unwrap();
        assert_eq!(config.temp_id_prefix, "local-");
        assert!(BoardConfig::load(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_remote_config_requires_url() {
        let json = r#"{ "url": "https://api.example.com" }"#;
        let config = RemoteConfig::from_json_str(json).unwrap();
        assert_eq!(config.token, "");
        assert!(RemoteConfig::from_json_str(r#"{ "url": "  " }"#).is_err());
    }
}
