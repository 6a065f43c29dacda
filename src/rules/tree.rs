//! Rule tree - an arena of folders and rules under an implicit root
//!
//! Nodes are addressed by [`NodeId`]. Ids are never reused, so an id that
//! outlives its node reliably reports [`TreeError::NodeNotFound`].

use std::fmt;
use thiserror::Error;
use tracing::debug;

use super::{Condition, Folder, Rule, RuleNode};

/// Stable handle of a node in a [`RuleTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Structural edit violations. Every failing edit leaves the tree untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Cannot add children to rule {0}")]
    InvalidParent(NodeId),

    #[error("Name must not be empty")]
    EmptyName,

    #[error("Node {0} is not a rule")]
    NotARule(NodeId),

    #[error("The root folder cannot be modified")]
    RootNode,

    #[error("Cycle detected: cannot move {node} into its own subtree at {target}")]
    CycleDetected { node: NodeId, target: NodeId },

    #[error("Position {position} is out of range (folder has {len} children)")]
    PositionOutOfRange { position: usize, len: usize },
}

type Result<T> = std::result::Result<T, TreeError>;

/// Condition and failure metadata of a rule node
#[derive(Debug, Clone, PartialEq)]
pub struct RuleBody {
    pub condition: Condition,
    pub error_message: String,
    pub fix_action: String,
}

/// What a node is
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Folder { children: Vec<NodeId> },
    Rule(RuleBody),
}

/// One folder or rule stored in the tree
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    enabled: bool,
    parent: Option<NodeId>,
    kind: NodeKind,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The node's own flag; see [`RuleTree::is_effectively_enabled`]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder { .. })
    }

    pub fn as_rule(&self) -> Option<&RuleBody> {
        match &self.kind {
            NodeKind::Rule(body) => Some(body),
            NodeKind::Folder { .. } => None,
        }
    }

    /// Ordered children; empty for rules
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Folder { children } => children,
            NodeKind::Rule(_) => &[],
        }
    }
}

/// A checklist document: folders and rules under an implicit, always
/// enabled root folder.
///
/// The tree also carries the editor focus (the folder new nodes go into by
/// default) and a dirty flag set by every edit.
#[derive(Debug, Clone)]
pub struct RuleTree {
    nodes: Vec<Option<Node>>,
    root: NodeId,
    focus: Option<NodeId>,
    dirty: bool,
}

impl Default for RuleTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for RuleTree {
    fn eq(&self, other: &Self) -> bool {
        self.to_nodes() == other.to_nodes()
    }
}

impl RuleTree {
    /// Create an empty tree
    pub fn new() -> Self {
        let root = Node {
            name: String::new(),
            enabled: true,
            parent: None,
            kind: NodeKind::Folder {
                children: Vec::new(),
            },
        };

        Self {
            nodes: vec![Some(root)],
            root: NodeId(0),
            focus: None,
            dirty: false,
        }
    }

    /// Build a clean tree from detached nodes, re-cascading disabled folders
    pub fn from_nodes(nodes: Vec<RuleNode>) -> Self {
        let mut tree = Self::new();
        let root = tree.root;
        let ids: Vec<NodeId> = nodes
            .into_iter()
            .map(|node| tree.alloc(node, root, false))
            .collect();
        if let Some(children) = tree.children_mut(root) {
            children.extend(ids);
        }
        tree
    }

    /// Detached copies of the root's children
    pub fn to_nodes(&self) -> Vec<RuleNode> {
        self.children(self.root)
            .iter()
            .filter_map(|&id| self.detach(id))
            .collect()
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Look up a live node
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    /// Look up a live node, failing with `NodeNotFound`
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.get(id).ok_or(TreeError::NodeNotFound(id))
    }

    /// Ordered children of a folder; empty for rules and unknown ids
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(Node::children).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::parent)
    }

    /// Number of folders and rules, not counting the root
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Forget unsaved changes, e.g. after a save
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn focus(&self) -> Option<NodeId> {
        self.focus
    }

    /// Select the node new children are added to by default
    pub fn set_focus(&mut self, id: Option<NodeId>) -> Result<()> {
        if let Some(id) = id {
            self.node(id)?;
        }
        self.focus = id;
        Ok(())
    }

    /// True when the node and every ancestor folder are enabled
    pub fn is_effectively_enabled(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(id) = current {
            match self.get(id) {
                Some(node) if node.enabled => current = node.parent,
                _ => return false,
            }
        }
        true
    }

    /// Every node in depth-first pre-order with its depth (root children at 0)
    pub fn walk(&self) -> Vec<(usize, NodeId)> {
        let mut out = Vec::new();
        let mut stack: Vec<(usize, NodeId)> = self
            .children(self.root)
            .iter()
            .rev()
            .map(|&id| (0, id))
            .collect();

        while let Some((depth, id)) = stack.pop() {
            out.push((depth, id));
            stack.extend(self.children(id).iter().rev().map(|&c| (depth + 1, c)));
        }
        out
    }

    /// Insert a detached subtree.
    ///
    /// With no parent, the node goes into the focused folder, or the root
    /// when nothing (or a rule) is focused. `position` defaults to append.
    pub fn add_child(
        &mut self,
        parent: Option<NodeId>,
        node: impl Into<RuleNode>,
        position: Option<usize>,
    ) -> Result<NodeId> {
        let parent = self.target_folder(parent)?;
        let len = self.children(parent).len();
        let position = position.unwrap_or(len);
        if position > len {
            return Err(TreeError::PositionOutOfRange { position, len });
        }

        let node = node.into();
        debug!("Adding '{}' under {}", node.name(), parent);
        let force_disabled = !self.is_effectively_enabled(parent);
        let id = self.alloc(node, parent, force_disabled);
        if let Some(children) = self.children_mut(parent) {
            children.insert(position, id);
        }
        self.dirty = true;
        Ok(id)
    }

    /// Add an empty, enabled folder
    pub fn add_folder(&mut self, parent: Option<NodeId>, name: &str) -> Result<NodeId> {
        if name.trim().is_empty() {
            return Err(TreeError::EmptyName);
        }
        self.add_child(parent, Folder::new(name), None)
    }

    /// Add an enabled rule built from a condition and its metadata
    pub fn add_rule(
        &mut self,
        parent: Option<NodeId>,
        name: &str,
        condition: Condition,
        error_message: &str,
        fix_action: &str,
    ) -> Result<NodeId> {
        let rule = Rule::new(name, condition, error_message).with_fix(fix_action);
        self.add_child(parent, rule, None)
    }

    /// Set a node's enabled flag. Folders overwrite every descendant too.
    pub fn set_enabled(&mut self, id: NodeId, enabled: bool) -> Result<()> {
        self.node(id)?;
        if id == self.root {
            return Err(TreeError::RootNode);
        }

        let mut targets = vec![id];
        targets.extend(self.descendants(id));
        for target in targets {
            if let Some(node) = self.node_mut(target) {
                node.enabled = enabled;
            }
        }

        debug!("Set {} enabled = {}", id, enabled);
        self.dirty = true;
        Ok(())
    }

    pub fn rename(&mut self, id: NodeId, name: &str) -> Result<()> {
        self.node(id)?;
        if id == self.root {
            return Err(TreeError::RootNode);
        }
        if name.trim().is_empty() {
            return Err(TreeError::EmptyName);
        }

        if let Some(node) = self.node_mut(id) {
            node.name = name.to_string();
        }
        self.dirty = true;
        Ok(())
    }

    /// Replace a rule's condition, error message and fix action together
    pub fn edit_rule_condition(
        &mut self,
        id: NodeId,
        condition: Condition,
        error_message: &str,
        fix_action: &str,
    ) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(TreeError::NodeNotFound(id))?;

        let NodeKind::Rule(body) = &mut node.kind else {
            return Err(TreeError::NotARule(id));
        };
        *body = RuleBody {
            condition,
            error_message: error_message.to_string(),
            fix_action: fix_action.to_string(),
        };

        self.dirty = true;
        Ok(())
    }

    /// Detach a node and drop its whole subtree
    pub fn remove_node(&mut self, id: NodeId) -> Result<RuleNode> {
        let parent = self.node(id)?.parent.ok_or(TreeError::RootNode)?;
        let detached = self.detach(id).ok_or(TreeError::NodeNotFound(id))?;

        if let Some(children) = self.children_mut(parent) {
            children.retain(|&c| c != id);
        }
        let mut doomed = vec![id];
        doomed.extend(self.descendants(id));
        if self.focus.is_some_and(|f| doomed.contains(&f)) {
            self.focus = None;
        }
        for gone in doomed {
            self.nodes[gone.0] = None;
        }

        debug!("Removed '{}' ({})", detached.name(), id);
        self.dirty = true;
        Ok(detached)
    }

    /// Reparent or reorder a node (drag and drop).
    ///
    /// `position` indexes the destination's children after the node has
    /// been taken out of its current place.
    pub fn move_node(
        &mut self,
        id: NodeId,
        new_parent: NodeId,
        position: Option<usize>,
    ) -> Result<()> {
        let old_parent = self.node(id)?.parent.ok_or(TreeError::RootNode)?;
        let new_parent = self.target_folder(Some(new_parent))?;

        if new_parent == id || self.descendants(id).contains(&new_parent) {
            return Err(TreeError::CycleDetected {
                node: id,
                target: new_parent,
            });
        }

        let mut len = self.children(new_parent).len();
        if new_parent == old_parent {
            len -= 1;
        }
        let position = position.unwrap_or(len);
        if position > len {
            return Err(TreeError::PositionOutOfRange { position, len });
        }

        if let Some(children) = self.children_mut(old_parent) {
            children.retain(|&c| c != id);
        }
        if let Some(children) = self.children_mut(new_parent) {
            children.insert(position, id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = Some(new_parent);
        }

        // Landing in a disabled folder disables the moved subtree
        if !self.is_effectively_enabled(new_parent) {
            let mut targets = vec![id];
            targets.extend(self.descendants(id));
            for target in targets {
                if let Some(node) = self.node_mut(target) {
                    node.enabled = false;
                }
            }
        }

        debug!("Moved {} to {} at {}", id, new_parent, position);
        self.dirty = true;
        Ok(())
    }

    fn target_folder(&self, parent: Option<NodeId>) -> Result<NodeId> {
        match parent {
            Some(id) if self.node(id)?.is_folder() => Ok(id),
            Some(id) => Err(TreeError::InvalidParent(id)),
            None => Ok(self
                .focus
                .filter(|&f| self.get(f).is_some_and(Node::is_folder))
                .unwrap_or(self.root)),
        }
    }

    fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    fn children_mut(&mut self, id: NodeId) -> Option<&mut Vec<NodeId>> {
        match self.node_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Folder { children }) => Some(children),
            _ => None,
        }
    }

    /// Store a subtree without linking it into its parent's children.
    /// A disabled folder forces its descendants disabled.
    fn alloc(&mut self, node: RuleNode, parent: NodeId, force_disabled: bool) -> NodeId {
        let id = NodeId(self.nodes.len());
        match node {
            RuleNode::Rule(rule) => {
                self.nodes.push(Some(Node {
                    name: rule.name,
                    enabled: rule.enabled && !force_disabled,
                    parent: Some(parent),
                    kind: NodeKind::Rule(RuleBody {
                        condition: rule.condition,
                        error_message: rule.error_message,
                        fix_action: rule.fix_action,
                    }),
                }));
            }
            RuleNode::Folder(folder) => {
                let enabled = folder.enabled && !force_disabled;
                self.nodes.push(Some(Node {
                    name: folder.name,
                    enabled,
                    parent: Some(parent),
                    kind: NodeKind::Folder {
                        children: Vec::new(),
                    },
                }));
                let children: Vec<NodeId> = folder
                    .children
                    .into_iter()
                    .map(|child| self.alloc(child, id, !enabled))
                    .collect();
                if let Some(slot) = self.children_mut(id) {
                    slot.extend(children);
                }
            }
        }
        id
    }

    fn detach(&self, id: NodeId) -> Option<RuleNode> {
        let node = self.get(id)?;

        Some(match &node.kind {
            NodeKind::Folder { children } => RuleNode::Folder(Folder {
                name: node.name.clone(),
                enabled: node.enabled,
                children: children.iter().filter_map(|&c| self.detach(c)).collect(),
            }),
            NodeKind::Rule(body) => RuleNode::Rule(Rule {
                name: node.name.clone(),
                enabled: node.enabled,
                condition: body.condition.clone(),
                error_message: body.error_message.clone(),
                fix_action: body.fix_action.clone(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_empty(path: &str) -> Condition {
        Condition::PropertyNotEmpty {
            path: path.to_string(),
        }
    }

    fn output_rule() -> Rule {
        Rule::new("Output path", not_empty("rendOutputFilename"), "No output path")
    }

    #[test]
    fn test_add_appends_in_order() {
        let mut tree = RuleTree::new();
        let a = tree.add_folder(None, "Render").unwrap();
        let b = tree.add_folder(None, "Lights").unwrap();
        let c = tree.add_child(None, output_rule(), Some(0)).unwrap();

        assert_eq!(tree.children(tree.root()), [c, a, b]);
        assert_eq!(tree.len(), 3);
        assert!(tree.is_dirty());
    }

    #[test]
    fn test_add_uses_focused_folder() {
        let mut tree = RuleTree::new();
        let folder = tree.add_folder(None, "Render").unwrap();
        tree.set_focus(Some(folder)).unwrap();

        let rule = tree.add_child(None, output_rule(), None).unwrap();
        assert_eq!(tree.parent(rule), Some(folder));

        // A focused rule is not a folder, so new nodes land at the root
        tree.set_focus(Some(rule)).unwrap();
        let other = tree.add_folder(None, "Lights").unwrap();
        assert_eq!(tree.parent(other), Some(tree.root()));
    }

    #[test]
    fn test_rules_are_leaves() {
        let mut tree = RuleTree::new();
        let rule = tree.add_child(None, output_rule(), None).unwrap();

        assert_eq!(
            tree.add_folder(Some(rule), "Nested"),
            Err(TreeError::InvalidParent(rule))
        );
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_position_out_of_range_is_rejected() {
        let mut tree = RuleTree::new();
        tree.add_folder(None, "Render").unwrap();
        assert_eq!(
            tree.add_child(None, output_rule(), Some(5)),
            Err(TreeError::PositionOutOfRange { position: 5, len: 1 })
        );
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_disable_cascades_to_all_descendants() {
        let mut tree = RuleTree::new();
        let top = tree.add_folder(None, "Render").unwrap();
        let nested = tree.add_folder(Some(top), "Output").unwrap();
        let r1 = tree.add_child(Some(top), output_rule(), None).unwrap();
        let r2 = tree.add_child(Some(nested), output_rule().disabled(), None).unwrap();
        let r3 = tree.add_child(Some(nested), output_rule(), None).unwrap();

        tree.set_enabled(top, false).unwrap();
        for id in [top, nested, r1, r2, r3] {
            assert!(!tree.node(id).unwrap().is_enabled());
            assert!(!tree.is_effectively_enabled(id));
        }

        // Cascade overwrites unconditionally, including previously disabled rules
        tree.set_enabled(top, true).unwrap();
        assert!(tree.node(r2).unwrap().is_enabled());
    }

    #[test]
    fn test_rule_toggle_does_not_cascade_up() {
        let mut tree = RuleTree::new();
        let folder = tree.add_folder(None, "Render").unwrap();
        let rule = tree.add_child(Some(folder), output_rule(), None).unwrap();

        tree.set_enabled(rule, false).unwrap();
        assert!(tree.node(folder).unwrap().is_enabled());
        assert_eq!(tree.set_enabled(tree.root(), false), Err(TreeError::RootNode));
    }

    #[test]
    fn test_load_recascades_disabled_folders() {
        let folder = Folder {
            name: "Legacy".to_string(),
            enabled: false,
            children: vec![output_rule().into()],
        };
        let tree = RuleTree::from_nodes(vec![folder.into()]);

        let folder_id = tree.children(tree.root())[0];
        let rule_id = tree.children(folder_id)[0];
        assert!(!tree.node(rule_id).unwrap().is_enabled());
        assert!(!tree.is_dirty());
    }

    #[test]
    fn test_rename() {
        let mut tree = RuleTree::new();
        let folder = tree.add_folder(None, "Render").unwrap();

        assert_eq!(tree.rename(folder, "   "), Err(TreeError::EmptyName));
        assert_eq!(tree.node(folder).unwrap().name(), "Render");

        tree.rename(folder, "Render Settings").unwrap();
        assert_eq!(tree.node(folder).unwrap().name(), "Render Settings");
        assert_eq!(tree.add_folder(None, ""), Err(TreeError::EmptyName));
    }

    #[test]
    fn test_remove_drops_subtree() {
        let mut tree = RuleTree::new();
        let folder = tree.add_folder(None, "Render").unwrap();
        let rule = tree.add_child(Some(folder), output_rule(), None).unwrap();
        tree.set_focus(Some(rule)).unwrap();

        let removed = tree.remove_node(folder).unwrap();
        assert_eq!(removed.name(), "Render");
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.focus(), None);
        assert_eq!(tree.node(rule).unwrap_err(), TreeError::NodeNotFound(rule));
        assert_eq!(tree.remove_node(tree.root()), Err(TreeError::RootNode));
    }

    #[test]
    fn test_edit_rule_condition() {
        let mut tree = RuleTree::new();
        let folder = tree.add_folder(None, "Render").unwrap();
        let rule = tree.add_child(Some(folder), output_rule(), None).unwrap();

        let width = Condition::MinValue {
            path: "renderWidth".to_string(),
            threshold: "1920".to_string(),
        };
        tree.edit_rule_condition(rule, width.clone(), "Too narrow", "renderWidth = 1920")
            .unwrap();

        let body = tree.node(rule).unwrap().as_rule().unwrap();
        assert_eq!(body.condition, width);
        assert_eq!(body.error_message, "Too narrow");
        assert_eq!(body.fix_action, "renderWidth = 1920");

        assert_eq!(
            tree.edit_rule_condition(folder, width, "", ""),
            Err(TreeError::NotARule(folder))
        );
    }

    #[test]
    fn test_move_reorders_and_reparents() {
        let mut tree = RuleTree::new();
        let a = tree.add_folder(None, "A").unwrap();
        let b = tree.add_folder(None, "B").unwrap();
        let rule = tree.add_child(None, output_rule(), None).unwrap();

        tree.move_node(rule, tree.root(), Some(0)).unwrap();
        assert_eq!(tree.children(tree.root()), [rule, a, b]);

        tree.move_node(rule, b, None).unwrap();
        assert_eq!(tree.children(tree.root()), [a, b]);
        assert_eq!(tree.children(b), [rule]);
        assert_eq!(tree.parent(rule), Some(b));
    }

    #[test]
    fn test_move_into_own_subtree_is_rejected() {
        let mut tree = RuleTree::new();
        let a = tree.add_folder(None, "A").unwrap();
        let inner = tree.add_folder(Some(a), "Inner").unwrap();

        assert_eq!(
            tree.move_node(a, inner, None),
            Err(TreeError::CycleDetected {
                node: a,
                target: inner
            })
        );
        assert_eq!(tree.parent(inner), Some(a));
    }

    #[test]
    fn test_move_into_disabled_folder_disables_subtree() {
        let mut tree = RuleTree::new();
        let off = tree.add_folder(None, "Off").unwrap();
        tree.set_enabled(off, false).unwrap();
        let rule = tree.add_child(None, output_rule(), None).unwrap();

        tree.move_node(rule, off, None).unwrap();
        assert!(!tree.node(rule).unwrap().is_enabled());
    }

    #[test]
    fn test_structural_equality_ignores_ids_and_state() {
        let mut built = RuleTree::new();
        let folder = built.add_folder(None, "Render").unwrap();
        built.add_child(Some(folder), output_rule(), None).unwrap();

        let loaded =
            RuleTree::from_nodes(vec![Folder::new("Render").with_child(output_rule()).into()]);
        assert_eq!(built, loaded);
        assert!(built.is_dirty());
        assert!(!loaded.is_dirty());
    }

    #[test]
    fn test_walk_is_pre_order() {
        let mut tree = RuleTree::new();
        let a = tree.add_folder(None, "A").unwrap();
        let a1 = tree.add_child(Some(a), output_rule(), None).unwrap();
        let b = tree.add_folder(None, "B").unwrap();

        assert_eq!(tree.walk(), vec![(0, a), (1, a1), (0, b)]);
    }
}
