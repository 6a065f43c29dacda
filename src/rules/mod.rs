//! Rule engine - the rule tree, conditions, and the checklist runner

mod condition;
mod engine;
mod tree;

pub use condition::{Condition, Verdict};
pub use engine::{ChecklistRunner, Failure, FixOutcome, FixReport, RunError, RunResult};
pub use tree::{Node, NodeId, NodeKind, RuleBody, RuleTree, TreeError};

/// A rule or folder detached from any tree.
///
/// This is the owned form used to insert subtrees, persist them, and
/// compare trees structurally.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleNode {
    Folder(Folder),
    Rule(Rule),
}

impl RuleNode {
    pub fn name(&self) -> &str {
        match self {
            RuleNode::Folder(folder) => &folder.name,
            RuleNode::Rule(rule) => &rule.name,
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            RuleNode::Folder(folder) => folder.enabled,
            RuleNode::Rule(rule) => rule.enabled,
        }
    }
}

impl From<Folder> for RuleNode {
    fn from(folder: Folder) -> Self {
        RuleNode::Folder(folder)
    }
}

impl From<Rule> for RuleNode {
    fn from(rule: Rule) -> Self {
        RuleNode::Rule(rule)
    }
}

/// A group of rules and folders
#[derive(Debug, Clone, PartialEq)]
pub struct Folder {
    /// Display label, not an identifier
    pub name: String,

    /// Cascades to every descendant when changed through the tree
    pub enabled: bool,

    /// Ordered children
    pub children: Vec<RuleNode>,
}

impl Folder {
    /// Create an empty, enabled folder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            children: Vec::new(),
        }
    }

    /// Append a child, builder style
    pub fn with_child(mut self, child: impl Into<RuleNode>) -> Self {
        self.children.push(child.into());
        self
    }
}

/// A single check with its failure metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// Human-readable name
    pub name: String,

    /// Whether the rule is active
    pub enabled: bool,

    /// What to check
    pub condition: Condition,

    /// Reported when the check fails
    pub error_message: String,

    /// Opaque action that repairs the scene; empty means no fix
    pub fix_action: String,
}

impl Rule {
    /// Create a new enabled rule without a fix action
    pub fn new(
        name: impl Into<String>,
        condition: Condition,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            condition,
            error_message: error_message.into(),
            fix_action: String::new(),
        }
    }

    /// Attach a fix action
    pub fn with_fix(mut self, fix_action: impl Into<String>) -> Self {
        self.fix_action = fix_action.into();
        self
    }

    /// Mark the rule disabled
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}
