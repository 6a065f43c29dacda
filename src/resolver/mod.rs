//! Property resolution - the bridge to the inspected host scene
//!
//! Property paths and fix actions are opaque strings here. Only the
//! resolver implementation understands the host's expression syntax.

mod command;
mod snapshot;

pub use command::{CommandResolver, CommandResolverConfig};
pub use snapshot::SnapshotResolver;

use std::fmt;
use thiserror::Error;

/// Errors raised while resolving a property path
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolutionError {
    /// Nothing exists at the given path
    #[error("no property at '{0}'")]
    NotFound(String),

    /// The path resolved, but not to a collection
    #[error("'{0}' is not a collection")]
    NotACollection(String),

    /// The host could not be reached at all
    #[error("target system unavailable: {0}")]
    Unavailable(String),

    /// The host reported an error of its own
    #[error("{0}")]
    Host(String),
}

/// A fix action could not be run
#[derive(Debug, Clone, PartialEq, Error)]
#[error("failed to execute '{action}': {reason}")]
pub struct ExecutionError {
    pub action: String,
    pub reason: String,
}

impl ExecutionError {
    pub fn new(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            reason: reason.into(),
        }
    }
}

/// A dynamically typed value read from the host
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    /// Numeric view of the value, if it has one.
    ///
    /// Text is trimmed and parsed; booleans and empty values are not numbers.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Bool(_) | Value::Empty => None,
        }
    }

    /// True for the empty value and for text that is blank once trimmed
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Empty => true,
            Value::Text(s) => s.trim().is_empty(),
            Value::Bool(_) | Value::Number(_) => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<&serde_json::Value> for Value {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Empty,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(Value::Number)
                .unwrap_or_else(|| Value::Text(n.to_string())),
            serde_json::Value::String(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Capability supplied by the host environment.
///
/// The checklist engine never interprets paths or actions itself; it only
/// hands them to an implementation of this trait.
pub trait PropertyResolver {
    /// Opaque handle for one element of a resolved collection
    type Item;

    /// Resolve a property path to a value
    fn resolve(&self, path: &str) -> Result<Value, ResolutionError>;

    /// Resolve a path to a sequence of item handles
    fn resolve_collection(&self, path: &str) -> Result<Vec<Self::Item>, ResolutionError>;

    /// Resolve a named property on one collection item
    fn resolve_on_item(&self, item: &Self::Item, property: &str)
    -> Result<Value, ResolutionError>;

    /// Display name of a collection item
    fn name_of(&self, item: &Self::Item) -> String;

    /// Run a fix action against the host
    fn execute(&mut self, action: &str) -> Result<(), ExecutionError>;

    /// Check that the host is reachable before a run starts
    fn check_available(&self) -> Result<(), ResolutionError> {
        Ok(())
    }
}
