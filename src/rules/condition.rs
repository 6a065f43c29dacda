//! Rule conditions - checks run against properties of the host scene

use tracing::trace;

use crate::resolver::{PropertyResolver, ResolutionError, Value};

/// The predicate a rule checks against the target system.
///
/// Paths are opaque strings handed straight to the resolver.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Property must resolve to something non-blank
    PropertyNotEmpty { path: String },

    /// Property must be a number no smaller than `threshold`.
    ///
    /// The threshold is kept as written and parsed on every evaluation.
    MinValue { path: String, threshold: String },

    /// Property must be a number no larger than `threshold`
    MaxValue { path: String, threshold: String },

    /// Property must equal `expected`, ignoring case
    PropertyEquals { path: String, expected: String },

    /// No item of the collection may have `property` set to `false`
    CollectionAllMatch {
        collection_path: String,
        property: String,
    },
}

/// Outcome of evaluating one condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub passed: bool,
    pub message: String,
}

impl Verdict {
    fn pass() -> Self {
        Self {
            passed: true,
            message: "Passed".to_string(),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
        }
    }
}

impl Condition {
    /// Persisted name of this condition kind
    pub fn kind(&self) -> &'static str {
        match self {
            Condition::PropertyNotEmpty { .. } => "property_not_empty",
            Condition::MinValue { .. } => "min_value",
            Condition::MaxValue { .. } => "max_value",
            Condition::PropertyEquals { .. } => "property_equals",
            Condition::CollectionAllMatch { .. } => "collection_property_all_match",
        }
    }

    /// The path (or collection path) this condition reads
    pub fn target(&self) -> &str {
        match self {
            Condition::PropertyNotEmpty { path }
            | Condition::MinValue { path, .. }
            | Condition::MaxValue { path, .. }
            | Condition::PropertyEquals { path, .. } => path,
            Condition::CollectionAllMatch {
                collection_path, ..
            } => collection_path,
        }
    }

    /// Evaluate against the host for the rule named `rule_name`.
    ///
    /// Never fails: resolution and parse errors become a failed verdict
    /// so that one broken rule cannot abort a run.
    pub fn evaluate<R: PropertyResolver>(
        &self,
        rule_name: &str,
        error_message: &str,
        resolver: &R,
    ) -> Verdict {
        match self.check(rule_name, error_message, resolver) {
            Ok(()) => Verdict::pass(),
            Err(message) => Verdict::fail(message),
        }
    }

    fn check<R: PropertyResolver>(
        &self,
        rule_name: &str,
        error_message: &str,
        resolver: &R,
    ) -> Result<(), String> {
        let resolve = |path: &str| -> Result<Value, String> {
            if path.trim().is_empty() {
                return Err(format!("Rule '{}' has an empty target.", rule_name));
            }
            let value = resolver
                .resolve(path)
                .map_err(|e| format!("Error evaluating '{}': {}", path, e))?;
            trace!("Resolved '{}' = {:?}", path, value);
            Ok(value)
        };

        match self {
            Condition::PropertyNotEmpty { path } => {
                if resolve(path)?.is_blank() {
                    return Err(error_message.to_string());
                }
            }
            Condition::MinValue { path, threshold } => {
                let actual = resolve(path)?;
                let (value, limit) = numbers(&actual, threshold)
                    .ok_or_else(|| "Invalid number in min_value rule.".to_string())?;
                if value < limit {
                    return Err(format!(
                        "{} (Value: {}, Min: {})",
                        error_message, actual, threshold
                    ));
                }
            }
            Condition::MaxValue { path, threshold } => {
                let actual = resolve(path)?;
                let (value, limit) = numbers(&actual, threshold)
                    .ok_or_else(|| "Invalid number in max_value rule.".to_string())?;
                if value > limit {
                    return Err(format!(
                        "{} (Value: {}, Max: {})",
                        error_message, actual, threshold
                    ));
                }
            }
            Condition::PropertyEquals { path, expected } => {
                let actual = resolve(path)?;
                if actual.to_string().to_lowercase() != expected.to_lowercase() {
                    return Err(format!(
                        "{} (Value: {}, Expected: {})",
                        error_message, actual, expected
                    ));
                }
            }
            Condition::CollectionAllMatch {
                collection_path,
                property,
            } => {
                let mismatched = check_collection(collection_path, property, resolver)
                    .map_err(|e| format!("Error evaluating collection rule: {}", e))?;
                if !mismatched.is_empty() {
                    return Err(format!("{}: {}", error_message, mismatched.join(", ")));
                }
            }
        }

        Ok(())
    }
}

/// The resolved value and the threshold text as numbers, if both parse
fn numbers(actual: &Value, threshold: &str) -> Option<(f64, f64)> {
    let limit = threshold.trim().parse::<f64>().ok()?;
    Some((actual.as_number()?, limit))
}

/// Names of the items whose `property` is exactly `false`, in collection order.
///
/// Non-boolean falsy values (0, "") are not mismatches.
fn check_collection<R: PropertyResolver>(
    collection_path: &str,
    property: &str,
    resolver: &R,
) -> Result<Vec<String>, ResolutionError> {
    let mut mismatched = Vec::new();
    for item in resolver.resolve_collection(collection_path)? {
        if resolver.resolve_on_item(&item, property)? == Value::Bool(false) {
            mismatched.push(resolver.name_of(&item));
        }
    }
    Ok(mismatched)
}
