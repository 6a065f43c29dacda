//! Configuration schema

use crate::resolver::CommandResolverConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// How the host scene is reached
    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// General application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Rule document to use instead of the per-user default
    #[serde(default)]
    pub rules_file: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            rules_file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Which property resolver the CLI talks to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResolverConfig {
    /// Read values from a captured JSON snapshot; fixes are only recorded
    Snapshot {
        #[serde(default)]
        path: Option<PathBuf>,
    },

    /// Shell out to a host bridge
    Command(CommandResolverConfig),
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig::Snapshot { path: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_parse_snapshot_config() {
        let toml = r#"
            [general]
            log_level = "debug"
            rules_file = "~/scenelint/rules.json"

            [resolver]
            kind = "snapshot"
            path = "scene.json"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(
            config.general.rules_file,
            Some(PathBuf::from("~/scenelint/rules.json"))
        );
        assert_eq!(
            config.resolver,
            ResolverConfig::Snapshot {
                path: Some(PathBuf::from("scene.json"))
            }
        );
    }

    #[test]
    fn test_parse_command_config() {
        let toml = r#"
            [resolver]
            kind = "command"
            resolve_command = "maxbridge get"
            execute_command = "maxbridge exec"
            probe_command = "maxbridge ping"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        let ResolverConfig::Command(command) = config.resolver else {
            panic!("expected a command resolver");
        };
        assert_eq!(command.resolve_command, "maxbridge get");
        assert_eq!(command.execute_command, "maxbridge exec");
        assert_eq!(command.probe_command.as_deref(), Some("maxbridge ping"));
    }
}
