//! Constraint violation records.

use crate::core::group::Group;
use crate::core::value::Value;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Record of one failed constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Violation {
    /// Path of the offending element ("" for class-level constraints).
    pub path: String,
    /// Group the constraint was evaluated in.
    pub group: Group,
    /// Name of the constraint, e.g. "NotNull".
    pub constraint: String,
    /// Interpolated message.
    pub message: String,
    /// Message template before interpolation.
    pub message_template: String,
    /// The value that failed.
    pub invalid_value: Value,
    /// Type name of the root instance being validated, as given by
    /// [`std::any::type_name`]. Only the name is kept, never the instance.
    pub root_type: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Duplicate-free collection of violations, in the order they were found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViolationSet {
    violations: IndexSet<Violation>,
}

impl ViolationSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a violation. Returns false if an equal violation was already present.
    pub fn insert(&mut self, violation: Violation) -> bool {
        self.violations.insert(violation)
    }

    /// Add every violation of `other`.
    pub fn extend(&mut self, other: ViolationSet) {
        self.violations.extend(other.violations);
    }

    /// Number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Check if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Iterate over the violations.
    pub fn iter(&self) -> indexmap::set::Iter<'_, Violation> {
        self.violations.iter()
    }

    /// Messages of all violations.
    pub fn messages(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.message.as_str()).collect()
    }

    /// Violations on the given path.
    pub fn for_path(&self, path: &str) -> ViolationSet {
        self.violations
            .iter()
            .filter(|v| v.path == path)
            .cloned()
            .collect()
    }

    /// Get a human-readable summary.
    pub fn summary(&self) -> String {
        if self.is_empty() {
            "✓ No constraint violations".to_string()
        } else {
            format!("✗ {} constraint violation(s)", self.len())
        }
    }

    /// Get one line per violation.
    pub fn detailed(&self) -> Vec<String> {
        self.violations
            .iter()
            .enumerate()
            .map(|(i, v)| format!("{}. [{}] {}", i + 1, v.group, v))
            .collect()
    }

    /// Serialize the set as a JSON array.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl FromIterator<Violation> for ViolationSet {
    fn from_iter<I: IntoIterator<Item = Violation>>(iter: I) -> Self {
        Self {
            violations: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ViolationSet {
    type Item = Violation;
    type IntoIter = indexmap::set::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.into_iter()
    }
}

impl<'a> IntoIterator for &'a ViolationSet {
    type Item = &'a Violation;
    type IntoIter = indexmap::set::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(path: &str, message: &str) -> Violation {
        Violation {
            path: path.to_string(),
            group: Group::DEFAULT,
            constraint: "NotNull".to_string(),
            message: message.to_string(),
            message_template: message.to_string(),
            invalid_value: Value::None,
            root_type: "Account".to_string(),
        }
    }

    #[test]
    fn test_root_type_serializes_as_name() {
        let json = serde_json::to_value(violation("name", "may not be null")).unwrap();
        assert_eq!(json["root_type"], serde_json::json!("Account"));
    }

    #[test]
    fn test_duplicates_collapse() {
        let mut set = ViolationSet::new();
        assert!(set.insert(violation("name", "may not be null")));
        assert!(!set.insert(violation("name", "may not be null")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_for_path() {
        let set: ViolationSet = vec![
            violation("name", "may not be null"),
            violation("email", "may not be null"),
        ]
        .into_iter()
        .collect();

        let name_only = set.for_path("name");
        assert_eq!(name_only.len(), 1);
        assert_eq!(name_only.messages(), vec!["may not be null"]);
    }

    #[test]
    fn test_summary_and_json() {
        let mut set = ViolationSet::new();
        assert!(set.summary().contains("No constraint violations"));

        set.insert(violation("name", "may not be null"));
        assert!(set.summary().contains("1 constraint violation"));
        assert_eq!(set.detailed()[0], "1. [Default] name: may not be null");

        let json = set.to_json().unwrap();
        let parsed: ViolationSet = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, set);
    }
}
