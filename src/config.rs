use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::facets::FailureMode;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// `degrade` falls back to the applied distribution for a failed facet,
    /// `strict` fails the whole request.
    #[serde(default)]
    pub mode: FailureMode,

    /// Upper bound for a single facet aggregation.
    #[serde(default = "default_facet_timeout_ms")]
    pub facet_timeout_ms: u64,

    /// Tally records on the rayon pool.
    #[serde(default = "default_parallel_aggregation")]
    pub parallel_aggregation: bool,
}

fn default_facet_timeout_ms() -> u64 {
    5_000
}

fn default_parallel_aggregation() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: FailureMode::default(),
            facet_timeout_ms: default_facet_timeout_ms(),
            parallel_aggregation: default_parallel_aggregation(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Number of aggregate results kept.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_capacity() -> usize {
    256
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            capacity: default_cache_capacity(),
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("exifacet")
        .join("exifacet.db")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            engine: EngineConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Load from `EXIFACET_CONFIG` or the user config directory, writing the
    /// defaults there on first run.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os("EXIFACET_CONFIG") {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("exifacet")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            db_path = "/tmp/photos.db"

            [engine]
            mode = "strict"
            "#,
        )
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/photos.db"));
        assert_eq!(config.engine.mode, FailureMode::Strict);
        assert_eq!(config.engine.facet_timeout_ms, 5_000);
        assert!(config.engine.parallel_aggregation);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.capacity, 256);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.engine.facet_timeout_ms = 750;
        config.cache.enabled = false;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.engine.facet_timeout_ms, 750);
        assert!(!loaded.cache.enabled);
        assert_eq!(loaded.engine.mode, FailureMode::Degrade);
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let parsed: std::result::Result<Config, _> = toml::from_str("[engine]\nmode = \"lenient\"\n");
        assert!(parsed.is_err());
    }
}
