//! Rule documents - the persisted JSON form of a rule tree
//!
//! A document is the array of the root folder's children:
//!
//! ```json
//! [
//!     { "type": "folder", "name": "Render", "enabled": true, "children": [
//!         { "type": "rule", "name": "Width", "enabled": true,
//!           "condition": {
//!               "type": "min_value", "maxscript_property": "renderWidth", "value": "1920"
//!           },
//!           "error_message": "Render width too small", "fix_script": "renderWidth = 1920" }
//!     ] }
//! ]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::rules::{Condition, Folder, Rule, RuleNode, RuleTree};

/// A rule document could not be turned into a tree
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Well-formed JSON with the wrong shape or values
    #[error("Invalid rule document: {0}")]
    Format(String),

    #[error("Malformed rule document: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct RawNode {
    #[serde(rename = "type", default)]
    kind: String,

    #[serde(default = "default_name")]
    name: String,

    #[serde(default = "default_enabled")]
    enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    condition: Option<RawCondition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    fix_script: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    children: Option<Vec<RawNode>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawCondition {
    #[serde(rename = "type", default)]
    kind: String,

    #[serde(default)]
    maxscript_property: String,

    /// Always written as a string; older files may carry numbers
    #[serde(default)]
    value: serde_json::Value,
}

fn default_name() -> String {
    "Unnamed".to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_error_message() -> String {
    "A rule failed.".to_string()
}

/// Serialize a tree to its document value
pub fn to_document(tree: &RuleTree) -> Result<serde_json::Value, DocumentError> {
    Ok(serde_json::to_value(raw_nodes(tree))?)
}

/// Build a clean tree from a document value
pub fn from_document(document: serde_json::Value) -> Result<RuleTree, DocumentError> {
    let serde_json::Value::Array(items) = &document else {
        return Err(DocumentError::Format(
            "expected an array of rules and folders".to_string(),
        ));
    };
    check_objects(items)?;

    let raw: Vec<RawNode> = serde_json::from_value(document)?;
    let nodes = raw
        .into_iter()
        .map(from_raw)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RuleTree::from_nodes(nodes))
}

/// Serialize a tree to document text, indented four spaces
pub fn to_string(tree: &RuleTree) -> Result<String, DocumentError> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    raw_nodes(tree).serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Parse document text
pub fn parse(text: &str) -> Result<RuleTree, DocumentError> {
    from_document(serde_json::from_str(text)?)
}

/// Load a rule document from a file
pub fn load(path: &Path) -> Result<RuleTree> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read rules from {}", path.display()))?;
    let tree = parse(&content)
        .with_context(|| format!("Failed to parse rules from {}", path.display()))?;

    info!("Loaded rules from {}", path.display());
    Ok(tree)
}

/// Save a rule document (with advisory file locking) and mark the tree clean
pub fn save(path: &Path, tree: &mut RuleTree) -> Result<()> {
    let content = to_string(tree).context("Failed to serialize rules")?;
    crate::write_locked(path, &content).context("Failed to save rules")?;

    tree.mark_clean();
    info!("Saved rules to {}", path.display());
    Ok(())
}

fn raw_nodes(tree: &RuleTree) -> Vec<RawNode> {
    tree.to_nodes().iter().map(to_raw).collect()
}

fn check_objects(items: &[serde_json::Value]) -> Result<(), DocumentError> {
    for item in items {
        let Some(object) = item.as_object() else {
            return Err(DocumentError::Format(format!(
                "expected a rule or folder object, found {}",
                item
            )));
        };
        if let Some(children) = object.get("children") {
            let Some(children) = children.as_array() else {
                return Err(DocumentError::Format(
                    "folder children must be an array".to_string(),
                ));
            };
            check_objects(children)?;
        }
    }
    Ok(())
}

fn to_raw(node: &RuleNode) -> RawNode {
    match node {
        RuleNode::Folder(folder) => RawNode {
            kind: "folder".to_string(),
            name: folder.name.clone(),
            enabled: folder.enabled,
            condition: None,
            error_message: None,
            fix_script: None,
            children: Some(folder.children.iter().map(to_raw).collect()),
        },
        RuleNode::Rule(rule) => {
            let (property, value) = match &rule.condition {
                Condition::PropertyNotEmpty { path } => (path.clone(), String::new()),
                Condition::MinValue { path, threshold }
                | Condition::MaxValue { path, threshold } => (path.clone(), threshold.clone()),
                Condition::PropertyEquals { path, expected } => (path.clone(), expected.clone()),
                Condition::CollectionAllMatch {
                    collection_path,
                    property,
                } => (collection_path.clone(), property.clone()),
            };

            RawNode {
                kind: "rule".to_string(),
                name: rule.name.clone(),
                enabled: rule.enabled,
                condition: Some(RawCondition {
                    kind: rule.condition.kind().to_string(),
                    maxscript_property: property,
                    value: serde_json::Value::String(value),
                }),
                error_message: Some(rule.error_message.clone()),
                fix_script: Some(rule.fix_action.clone()),
                children: None,
            }
        }
    }
}

fn from_raw(raw: RawNode) -> Result<RuleNode, DocumentError> {
    // Anything that is not a folder is treated as a rule
    if raw.kind == "folder" {
        let children = raw
            .children
            .unwrap_or_default()
            .into_iter()
            .map(from_raw)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(RuleNode::Folder(Folder {
            name: raw.name,
            enabled: raw.enabled,
            children,
        }));
    }

    // A rule without a condition loads with an empty target and fails when run
    let condition = match raw.condition {
        Some(condition) => parse_condition(&raw.name, condition)?,
        None => Condition::PropertyNotEmpty {
            path: String::new(),
        },
    };

    Ok(RuleNode::Rule(Rule {
        name: raw.name,
        enabled: raw.enabled,
        condition,
        error_message: raw.error_message.unwrap_or_else(default_error_message),
        fix_action: raw.fix_script.unwrap_or_default(),
    }))
}

fn parse_condition(rule: &str, raw: RawCondition) -> Result<Condition, DocumentError> {
    let path = raw.maxscript_property;
    let value = match raw.value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    };

    Ok(match raw.kind.as_str() {
        "property_not_empty" => Condition::PropertyNotEmpty { path },
        "min_value" => Condition::MinValue {
            path,
            threshold: value,
        },
        "max_value" => Condition::MaxValue {
            path,
            threshold: value,
        },
        "property_equals" => Condition::PropertyEquals {
            path,
            expected: value,
        },
        "collection_property_all_match" => Condition::CollectionAllMatch {
            collection_path: path,
            property: value,
        },
        other => {
            return Err(DocumentError::Format(format!(
                "rule '{}': unknown condition type '{}'",
                rule, other
            )));
        }
    })
}
