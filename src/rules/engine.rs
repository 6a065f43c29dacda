//! Checklist runner - walks the rule tree and applies fixes

use thiserror::Error;
use tracing::{debug, info, trace, warn};

use super::{NodeId, NodeKind, RuleTree};
use crate::resolver::{PropertyResolver, ResolutionError};

/// A run could not start because the host is unusable
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    #[error("Target system unavailable: {0}")]
    ResolverUnavailable(#[source] ResolutionError),
}

/// One failed rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub rule: NodeId,
    pub rule_name: String,
    pub message: String,
    pub fix_action: String,
}

/// Result of a full traversal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    /// Failures in traversal order
    pub failures: Vec<Failure>,

    /// Number of rules evaluated
    pub evaluated: usize,
}

impl RunResult {
    /// True when every evaluated rule passed
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failures that carry a fix action
    pub fn fixable(&self) -> impl Iterator<Item = &Failure> {
        self.failures.iter().filter(|f| !f.fix_action.is_empty())
    }
}

/// Outcome of one attempted fix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixOutcome {
    pub rule_name: String,
    pub fix_action: String,
    pub succeeded: bool,
    pub error: Option<String>,
}

/// Outcome of a fix pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixReport {
    pub attempted: usize,
    pub outcomes: Vec<FixOutcome>,
}

impl FixReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded).count()
    }

    pub fn failed(&self) -> usize {
        self.attempted - self.succeeded()
    }
}

/// Engine for evaluating a rule tree against the host
pub struct ChecklistRunner<'a> {
    tree: &'a RuleTree,
}

impl<'a> ChecklistRunner<'a> {
    pub fn new(tree: &'a RuleTree) -> Self {
        Self { tree }
    }

    /// Evaluate every reachable enabled rule, depth-first in tree order.
    ///
    /// Disabled folders are not descended into and disabled rules are never
    /// evaluated. Per-rule errors are reported as failures; only an
    /// unreachable host aborts the run.
    pub fn run<R: PropertyResolver>(&self, resolver: &R) -> Result<RunResult, RunError> {
        resolver
            .check_available()
            .map_err(RunError::ResolverUnavailable)?;

        info!("Starting checks...");
        let mut result = RunResult::default();
        self.visit(self.tree.root(), resolver, &mut result);
        info!(
            "Checks finished: {} evaluated, {} failed",
            result.evaluated,
            result.failures.len()
        );

        Ok(result)
    }

    fn visit<R: PropertyResolver>(&self, folder: NodeId, resolver: &R, result: &mut RunResult) {
        for &id in self.tree.children(folder) {
            let Some(node) = self.tree.get(id) else {
                continue;
            };

            if !node.is_enabled() {
                trace!("Skipping disabled node: {}", node.name());
                continue;
            }

            match node.kind() {
                NodeKind::Folder { .. } => self.visit(id, resolver, result),
                NodeKind::Rule(body) => {
                    result.evaluated += 1;
                    let verdict =
                        body.condition.evaluate(node.name(), &body.error_message, resolver);
                    if verdict.passed {
                        debug!("Rule '{}' passed", node.name());
                    } else {
                        debug!("Rule '{}' failed: {}", node.name(), verdict.message);
                        result.failures.push(Failure {
                            rule: id,
                            rule_name: node.name().to_string(),
                            message: verdict.message,
                            fix_action: body.fix_action.clone(),
                        });
                    }
                }
            }
        }
    }

    /// Run the fix action of every failure that has one.
    ///
    /// Best effort: a failing fix is recorded and the pass continues.
    pub fn apply_fixes<R: PropertyResolver>(failures: &[Failure], resolver: &mut R) -> FixReport {
        info!("Attempting to run fixes...");
        let mut report = FixReport::default();

        for failure in failures.iter().filter(|f| !f.fix_action.is_empty()) {
            report.attempted += 1;
            let outcome = match resolver.execute(&failure.fix_action) {
                Ok(()) => {
                    info!("  > Executed fix: {}", failure.fix_action);
                    FixOutcome {
                        rule_name: failure.rule_name.clone(),
                        fix_action: failure.fix_action.clone(),
                        succeeded: true,
                        error: None,
                    }
                }
                Err(e) => {
                    warn!("  > FAILED to execute fix: {}. Error: {}", failure.fix_action, e);
                    FixOutcome {
                        rule_name: failure.rule_name.clone(),
                        fix_action: failure.fix_action.clone(),
                        succeeded: false,
                        error: Some(e.to_string()),
                    }
                }
            };
            report.outcomes.push(outcome);
        }

        report
    }
}
