//! Validation groups and group sequences.
//!
//! A group is a tag that partitions constraints so callers can validate a
//! subset of them, or validate subsets in a fixed order. Groups are plain
//! identifiers: either a named tag or a type token derived from a Rust type
//! path. Two groups are equal when their identifiers are equal.

use crate::core::error::DefinitionError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Identifier of a validation group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Group(Cow<'static, str>);

impl Group {
    /// The implicit group of every constraint declared without groups.
    pub const DEFAULT: Group = Group(Cow::Borrowed("Default"));

    /// Create a group from a name.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Create the group token for a Rust type.
    ///
    /// The token of a validated type is that type's own group: inside a
    /// redefined default sequence it stands for the type's Default constraints.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(Cow::Borrowed(std::any::type_name::<T>()))
    }

    /// The group identifier.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Check if this is the Default group.
    pub fn is_default(&self) -> bool {
        *self == Self::DEFAULT
    }
}

impl Default for Group {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Type tokens carry the whole module path; the last segment reads better.
        let name = self.name();
        let short = match name.rfind("::") {
            Some(idx) if !name.contains('<') => &name[idx + 2..],
            _ => name,
        };
        write!(f, "{}", short)
    }
}

impl From<&'static str> for Group {
    fn from(name: &'static str) -> Self {
        Self::named(name)
    }
}

/// An ordered, non-empty sequence of groups.
///
/// Groups of a sequence are evaluated one after another; evaluation stops at
/// the first group that produces a violation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GroupSequence {
    groups: Vec<Group>,
}

impl GroupSequence {
    /// Create a sequence. Fails if `groups` is empty.
    pub fn new(groups: Vec<Group>) -> Result<Self, DefinitionError> {
        if groups.is_empty() {
            return Err(DefinitionError::EmptySequence);
        }
        Ok(Self { groups })
    }

    /// The groups in evaluation order.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// The first group of the sequence.
    pub fn first(&self) -> &Group {
        // Non-empty by construction.
        &self.groups[0]
    }

    /// Number of groups in the sequence.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Always false; kept for API symmetry with collections.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Check if the sequence contains a group.
    pub fn contains(&self, group: &Group) -> bool {
        self.groups.contains(group)
    }

    /// Iterate over the groups in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Group> {
        self.groups.iter()
    }
}

impl TryFrom<Vec<Group>> for GroupSequence {
    type Error = DefinitionError;

    fn try_from(groups: Vec<Group>) -> Result<Self, Self::Error> {
        Self::new(groups)
    }
}

impl<'a> IntoIterator for &'a GroupSequence {
    type Item = &'a Group;
    type IntoIter = std::slice::Iter<'a, Group>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

impl fmt::Display for GroupSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.groups.iter().map(|g| g.to_string()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// A set of groups evaluated together as one step.
///
/// The first group is the group that was asked for; the rest are the groups
/// it inherits from. A constraint belongs to the batch if it is bound to any
/// of these groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GroupBatch {
    groups: Vec<Group>,
}

impl GroupBatch {
    /// A batch holding a single group.
    pub fn single(group: Group) -> Self {
        Self {
            groups: vec![group],
        }
    }

    /// A batch for `primary` plus its inherited groups.
    pub fn with_ancestors(primary: Group, ancestors: impl IntoIterator<Item = Group>) -> Self {
        let mut groups = vec![primary];
        for group in ancestors {
            if !groups.contains(&group) {
                groups.push(group);
            }
        }
        Self { groups }
    }

    /// The group that was asked for.
    pub fn primary(&self) -> &Group {
        &self.groups[0]
    }

    /// All groups of the batch, primary first.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Check if the batch covers `group`.
    pub fn covers(&self, group: &Group) -> bool {
        self.groups.contains(group)
    }
}

impl fmt::Display for GroupBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.groups.iter().map(|g| g.to_string()).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Account;

    #[test]
    fn test_default_group() {
        assert!(Group::DEFAULT.is_default());
        assert!(Group::named("Default").is_default());
        assert!(!Group::named("Strict").is_default());
        assert_eq!(Group::default(), Group::DEFAULT);
    }

    #[test]
    fn test_type_token_identity() {
        assert_eq!(Group::of::<Account>(), Group::of::<Account>());
        assert_ne!(Group::of::<Account>(), Group::named("Account"));
        assert_eq!(Group::of::<Account>().to_string(), "Account");
    }

    #[test]
    fn test_empty_sequence_rejected() {
        let result = GroupSequence::new(Vec::new());
        assert!(matches!(result, Err(DefinitionError::EmptySequence)));
    }

    #[test]
    fn test_sequence_order() {
        let seq = GroupSequence::new(vec![Group::named("First"), Group::named("Second")]).unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.first(), &Group::named("First"));
        assert_eq!(seq.to_string(), "[First, Second]");
    }

    #[test]
    fn test_batch_dedups_ancestors() {
        let batch = GroupBatch::with_ancestors(
            Group::named("Strict"),
            vec![Group::named("Basic"), Group::named("Strict"), Group::named("Basic")],
        );
        assert_eq!(batch.groups().len(), 2);
        assert_eq!(batch.primary(), &Group::named("Strict"));
        assert!(batch.covers(&Group::named("Basic")));
    }
}
