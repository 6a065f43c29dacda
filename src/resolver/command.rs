//! Resolver that shells out to a host bridge command

use serde::{Deserialize, Serialize};
use std::process::{Command, Output};
use tracing::{debug, info, warn};

use super::{ExecutionError, PropertyResolver, ResolutionError, Value};

/// Command lines used to talk to the host.
///
/// Each command line is split shell-style; the path or action is appended
/// as the final argument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandResolverConfig {
    /// Prints the value at a path to stdout (JSON or plain text)
    #[serde(default)]
    pub resolve_command: String,

    /// Runs a fix action
    #[serde(default)]
    pub execute_command: String,

    /// Exits successfully when the host is reachable
    #[serde(default)]
    pub probe_command: Option<String>,
}

/// Resolves properties by running external commands
#[derive(Debug, Clone)]
pub struct CommandResolver {
    config: CommandResolverConfig,
}

impl CommandResolver {
    pub fn new(config: CommandResolverConfig) -> Self {
        Self { config }
    }

    fn run(command_line: &str, arg: Option<&str>) -> Result<Output, String> {
        let parts = shlex::split(command_line)
            .ok_or_else(|| format!("Malformed command line: {}", command_line))?;
        let (program, base_args) = parts
            .split_first()
            .ok_or_else(|| "Command line is empty".to_string())?;

        let mut command = Command::new(program);
        command.args(base_args);
        if let Some(arg) = arg {
            command.arg(arg);
        }

        debug!("Running: {} {:?} {:?}", program, base_args, arg);
        command
            .output()
            .map_err(|e| format!("Failed to run {}: {}", program, e))
    }

    fn query(&self, path: &str) -> Result<serde_json::Value, ResolutionError> {
        let output = Self::run(&self.config.resolve_command, Some(path))
            .map_err(ResolutionError::Unavailable)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(if stderr.is_empty() {
                ResolutionError::NotFound(path.to_string())
            } else {
                ResolutionError::Host(stderr)
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let text = stdout.trim();
        Ok(serde_json::from_str(text)
            .unwrap_or_else(|_| serde_json::Value::String(text.to_string())))
    }
}

impl PropertyResolver for CommandResolver {
    type Item = serde_json::Value;

    fn resolve(&self, path: &str) -> Result<Value, ResolutionError> {
        self.query(path).map(|v| Value::from(&v))
    }

    fn resolve_collection(&self, path: &str) -> Result<Vec<Self::Item>, ResolutionError> {
        match self.query(path)? {
            serde_json::Value::Array(items) => Ok(items),
            _ => Err(ResolutionError::NotACollection(path.to_string())),
        }
    }

    fn resolve_on_item(
        &self,
        item: &Self::Item,
        property: &str,
    ) -> Result<Value, ResolutionError> {
        item.get(property)
            .map(Value::from)
            .ok_or_else(|| {
                ResolutionError::NotFound(format!("{}.{}", self.name_of(item), property))
            })
    }

    fn name_of(&self, item: &Self::Item) -> String {
        match item.get("name").and_then(|n| n.as_str()) {
            Some(name) => name.to_string(),
            None => item.to_string(),
        }
    }

    fn execute(&mut self, action: &str) -> Result<(), ExecutionError> {
        let output = Self::run(&self.config.execute_command, Some(action))
            .map_err(|reason| ExecutionError::new(action, reason))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let reason = if stderr.is_empty() {
                format!("exited with status {}", output.status)
            } else {
                stderr
            };
            return Err(ExecutionError::new(action, reason));
        }

        info!("Executed fix: {}", action);
        Ok(())
    }

    fn check_available(&self) -> Result<(), ResolutionError> {
        let Some(probe) = self.config.probe_command.as_deref() else {
            return Ok(());
        };

        match Self::run(probe, None) {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => {
                warn!("Probe command failed with status {}", output.status);
                Err(ResolutionError::Unavailable(format!(
                    "probe exited with status {}",
                    output.status
                )))
            }
            Err(e) => Err(ResolutionError::Unavailable(e)),
        }
    }
}
