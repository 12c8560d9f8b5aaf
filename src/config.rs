//! Application configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default HTTP port for the detection service
pub const DEFAULT_PORT: u16 = 7130;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub schema_version: u32,

    /// Root directory for stored profiles; defaults to `~/.moodgate/profiles`
    pub store_root: Option<PathBuf>,

    /// Path to the speaker embedding ONNX model; defaults to
    /// `~/.moodgate/models/voice_encoder.onnx`
    pub model_path: Option<PathBuf>,

    /// HTTP port for `serve`
    pub port: u16,

    /// Threads for embedding inference
    pub n_threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: 1,
            store_root: None,
            model_path: None,
            port: DEFAULT_PORT,
            n_threads: 2,
        }
    }
}

impl Config {
    /// Load config from file, or fall back to defaults when absent.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            serde_json::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")
    }

    /// Get the default config directory
    pub fn default_config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home.join(".moodgate"))
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.json"))
    }

    /// Resolve the profiles root (configured value or the default location).
    pub fn profiles_root(&self) -> Result<PathBuf> {
        if let Some(ref root) = self.store_root {
            Ok(root.clone())
        } else {
            Ok(Self::default_config_dir()?.join("profiles"))
        }
    }

    /// Resolve the embedding model path (configured value or the default
    /// location under the models directory).
    pub fn resolved_model_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.model_path {
            Ok(path.clone())
        } else {
            Ok(Self::default_config_dir()?
                .join("models")
                .join("voice_encoder.onnx"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.schema_version, 1);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.n_threads, 2);
        assert!(config.store_root.is_none());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.port = 9000;
        config.store_root = Some(PathBuf::from("/tmp/profiles"));
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.port, 9000);
        assert_eq!(loaded.store_root, Some(PathBuf::from("/tmp/profiles")));
    }

    #[test]
    fn test_profiles_root_prefers_configured_value() {
        let config = Config {
            store_root: Some(PathBuf::from("/data/profiles")),
            ..Default::default()
        };
        assert_eq!(
            config.profiles_root().unwrap(),
            PathBuf::from("/data/profiles")
        );
    }
}
