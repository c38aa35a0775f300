//! Configuration for keystore

use eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the store file
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Optional byte quota for the whole store
    #[serde(default)]
    pub quota_bytes: Option<usize>,
}

/// Default store directory, shared with the `ix` studio
pub fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ixstudio")
        .join("store")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            quota_bytes: None,
        }
    }
}

impl Config {
    /// Load config from file, or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            return Ok(config);
        }

        // Try default locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("keystore").join("config.yml")),
            Some(PathBuf::from("keystore.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let config: Config = serde_yaml::from_str(&content)?;
                return Ok(config);
            }
        }

        Ok(Config::default())
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("keystore.yml");
        let config = Config {
            store_path: temp.path().join("data"),
            quota_bytes: Some(5 * 1024 * 1024),
        };
        config.save(&path).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.store_path, temp.path().join("data"));
        assert_eq!(loaded.quota_bytes, Some(5 * 1024 * 1024));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: Config = serde_yaml::from_str("quota_bytes: 42\n").unwrap();
        assert_eq!(config.quota_bytes, Some(42));
        assert_eq!(config.store_path, default_store_path());
    }
}
