//! Resolver backed by a captured JSON snapshot of the scene

use anyhow::{Context, Result};
use std::cell::RefCell;
use std::path::Path;
use tracing::{debug, info};

use super::{ExecutionError, PropertyResolver, ResolutionError, Value};

/// Resolves properties from a JSON object captured from the host.
///
/// Fix actions cannot be applied to a snapshot, so `execute` only records
/// them (a dry run).
#[derive(Debug, Default)]
pub struct SnapshotResolver {
    root: serde_json::Value,
    lookups: RefCell<Vec<String>>,
    executed: Vec<String>,
}

impl SnapshotResolver {
    /// Create a resolver over an in-memory snapshot
    pub fn new(root: serde_json::Value) -> Self {
        Self {
            root,
            lookups: RefCell::new(Vec::new()),
            executed: Vec::new(),
        }
    }

    /// Load a snapshot from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot from {}", path.display()))?;
        let root: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot from {}", path.display()))?;
        info!("Loaded scene snapshot from {}", path.display());
        Ok(Self::new(root))
    }

    /// Every path looked up so far, in order
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.borrow().clone()
    }

    /// Fix actions recorded by `execute`
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    fn lookup(&self, path: &str) -> Result<&serde_json::Value, ResolutionError> {
        self.lookups.borrow_mut().push(path.to_string());

        if let Some(value) = self.root.get(path) {
            return Ok(value);
        }

        // Fall back to dotted traversal: "lights.count", "cameras.0.name"
        let mut current = &self.root;
        for segment in path.split('.') {
            let next = match current {
                serde_json::Value::Object(map) => map.get(segment),
                serde_json::Value::Array(items) => {
                    segment.parse::<usize>().ok().and_then(|i| items.get(i))
                }
                _ => None,
            };
            current = next.ok_or_else(|| ResolutionError::NotFound(path.to_string()))?;
        }
        Ok(current)
    }
}

impl PropertyResolver for SnapshotResolver {
    type Item = serde_json::Value;

    fn resolve(&self, path: &str) -> Result<Value, ResolutionError> {
        self.lookup(path).map(Value::from)
    }

    fn resolve_collection(&self, path: &str) -> Result<Vec<Self::Item>, ResolutionError> {
        match self.lookup(path)? {
            serde_json::Value::Array(items) => Ok(items.clone()),
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
        debug!("[dry-run] would execute: {}", action);
        self.executed.push(action.to_string());
        Ok(())
    }
}
