//! Configuration management

mod schema;

pub use schema::{Config, GeneralConfig, ResolverConfig};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

impl Config {
    /// Load configuration from a file or default location
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(PathBuf::from)
            .or_else(Self::default_path)
            .context("Could not determine config path")?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

            let config: Config = toml::from_str(&content).with_context(|| {
                format!("Failed to parse config from {}", config_path.display())
            })?;

            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file or the default location
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = path
            .map(PathBuf::from)
            .or_else(Self::default_path)
            .context("Could not determine config path")?;

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        crate::write_locked(&config_path, &content).context("Failed to save config")?;
        info!("Saved config to {}", config_path.display());
        Ok(())
    }

    /// Rule document to load: the configured file, else the per-user default
    pub fn rules_path(&self) -> Option<PathBuf> {
        match &self.general.rules_file {
            Some(path) => Some(crate::expand_home(path)),
            None => Self::data_dir().map(|d| d.join("rules.json")),
        }
    }

    /// Get the default config file path
    /// Uses the platform config directory (via dirs::config_dir), falling back to ~/.config
    pub fn default_path() -> Option<PathBuf> {
        let config_base =
            dirs::config_dir().or_else(|| dirs::home_dir().map(|d| d.join(".config")))?;
        Some(config_base.join("scenelint").join("config.toml"))
    }

    /// Get the default data directory
    pub fn data_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("scenelint"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::CommandResolverConfig;
    use assert_fs::prelude::*;
    use predicates::prelude::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = Config::load(Some(&temp.path().join("absent.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_then_load() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("nested").child("config.toml");

        let config = Config {
            general: GeneralConfig {
                log_level: "debug".to_string(),
                rules_file: Some(PathBuf::from("/srv/checklists/rules.json")),
            },
            resolver: ResolverConfig::Command(CommandResolverConfig {
                resolve_command: "maxbridge get".to_string(),
                execute_command: "maxbridge exec".to_string(),
                probe_command: None,
            }),
        };
        config.save(Some(file.path())).unwrap();

        file.assert(predicate::path::exists());
        file.assert(predicate::str::contains("kind = \"command\""));
        assert_eq!(Config::load(Some(file.path())).unwrap(), config);
        assert_eq!(
            config.rules_path(),
            Some(PathBuf::from("/srv/checklists/rules.json"))
        );
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("config.toml");
        file.write_str("[general\nlog_level = 3").unwrap();

        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }
}
