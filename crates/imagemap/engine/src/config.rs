//! Engine configuration

use std::path::{Path, PathBuf};

use imagemap_storage::{Edition, StorageOptions, WorldError, WorldHandle, WorldResult};
use serde::{Deserialize, Serialize};

use crate::chest::ChestOptions;

/// Engine configuration, read from TOML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How world files are encoded.
    pub storage: StorageOptions,

    /// How map chests look.
    pub chest: ChestOptions,
}

impl EngineConfig {
    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> WorldResult<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path()?,
        };

        if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).map_err(WorldError::io(&config_path))?;
            let config: EngineConfig =
                toml::from_str(&contents).map_err(|e| WorldError::Config(e.to_string()))?;
            Ok(config)
        } else {
            Ok(EngineConfig::default())
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> WorldResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| WorldError::Config("Cannot find config directory".into()))?;
        Ok(config_dir.join("imagemap").join("config.toml"))
    }

    /// Open a world with these settings, detecting the edition when none is given.
    pub fn open_world(&self, path: &Path, edition: Option<Edition>) -> WorldResult<WorldHandle> {
        match edition {
            Some(edition) => WorldHandle::open(path, edition, &self.storage),
            None => WorldHandle::open_detected(path, &self.storage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.storage.java_compression, 6);
        assert!(config.chest.name.is_none());
    }

    #[test]
    fn test_load_missing_config() {
        let config = EngineConfig::load(Some(Path::new("/nonexistent/path/config.toml"))).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_load_partial_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[storage]\njava_compression = 9\n\n[chest]\nname = \"Gallery\"\n",
        )
        .unwrap();

        let config = EngineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.storage.java_compression, 9);
        assert_eq!(config.storage.bedrock_compression, 6);
        assert_eq!(config.chest.name.as_deref(), Some("Gallery"));
    }

    #[test]
    fn test_load_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "storage = 3").unwrap();
        assert!(matches!(
            EngineConfig::load(Some(&path)),
            Err(WorldError::Config(_))
        ));
    }
}
