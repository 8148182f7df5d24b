//! Group relationships: inheritance and named sequences.
//!
//! A group may extend other groups; validating it also validates every group
//! it inherits from, in the same step. A group may also be defined as a named
//! sequence of other groups; requesting it evaluates those groups in order
//! with short-circuiting.

use crate::core::error::{DefinitionError, DefinitionResult};
use crate::core::group::{Group, GroupBatch, GroupSequence};
use indexmap::{IndexMap, IndexSet};
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use std::collections::VecDeque;

/// Registry of group inheritance and named group sequences.
#[derive(Debug, Clone, Default)]
pub struct GroupCatalog {
    /// Direct parents of each group.
    parents: IndexMap<Group, Vec<Group>>,
    /// Groups that stand for a sequence.
    sequences: IndexMap<Group, GroupSequence>,
}

impl GroupCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that `group` extends `parents`.
    pub fn extend(&mut self, group: Group, parents: impl IntoIterator<Item = Group>) {
        let entry = self.parents.entry(group).or_insert_with(Vec::new);
        for parent in parents {
            if !entry.contains(&parent) {
                entry.push(parent);
            }
        }
    }

    /// Define `name` as a sequence of groups.
    pub fn define_sequence(
        &mut self,
        name: Group,
        groups: impl IntoIterator<Item = Group>,
    ) -> DefinitionResult<()> {
        if self.sequences.contains_key(&name) {
            return Err(DefinitionError::DuplicateSequence(name));
        }
        let sequence = GroupSequence::new(groups.into_iter().collect())?;
        self.sequences.insert(name, sequence);
        Ok(())
    }

    /// The sequence `group` stands for, if it is a named sequence.
    pub fn sequence(&self, group: &Group) -> Option<&GroupSequence> {
        self.sequences.get(group)
    }

    /// Check if `group` is a named sequence.
    pub fn is_sequence(&self, group: &Group) -> bool {
        self.sequences.contains_key(group)
    }

    /// All groups `group` inherits from, nearest first, without duplicates.
    ///
    /// Walks breadth-first: direct parents in declaration order, then their
    /// parents, and so on.
    pub fn ancestors(&self, group: &Group) -> Vec<Group> {
        let mut seen: IndexSet<Group> = IndexSet::new();
        let mut frontier: VecDeque<&Group> = VecDeque::from([group]);

        while let Some(current) = frontier.pop_front() {
            if let Some(parents) = self.parents.get(current) {
                for parent in parents {
                    if parent != group && seen.insert(parent.clone()) {
                        frontier.push_back(parent);
                    }
                }
            }
        }

        seen.into_iter().collect()
    }

    /// The batch evaluated when `group` is reached: the group plus everything
    /// it inherits from.
    pub fn batch_for(&self, group: &Group) -> GroupBatch {
        GroupBatch::with_ancestors(group.clone(), self.ancestors(group))
    }

    /// Check the catalog for cycles across inheritance and sequence
    /// membership, and for a sequence named Default.
    pub fn verify(&self) -> DefinitionResult<()> {
        self.verify_with_own_groups(std::iter::empty())
    }

    /// Like [`verify`](Self::verify), also rejecting sequences named after
    /// any of `own_groups`. A type's own group must stay a plain group so a
    /// redefined Default can expand through it.
    pub fn verify_with_own_groups<'a>(
        &self,
        own_groups: impl IntoIterator<Item = &'a Group>,
    ) -> DefinitionResult<()> {
        let own_groups: IndexSet<&Group> = own_groups.into_iter().collect();
        for name in self.sequences.keys() {
            if name.is_default() || own_groups.contains(name) {
                log::warn!("Group {} cannot name a group sequence", name);
                return Err(DefinitionError::ReservedSequenceName(name.clone()));
            }
        }

        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        for (group, parents) in &self.parents {
            graph.add_node(group.name());
            for parent in parents {
                graph.add_edge(group.name(), parent.name(), ());
            }
        }
        for (name, sequence) in &self.sequences {
            graph.add_node(name.name());
            for member in sequence {
                graph.add_edge(name.name(), member.name(), ());
            }
        }

        for component in tarjan_scc(&graph) {
            let self_loop = component.len() == 1 && graph.contains_edge(component[0], component[0]);
            if component.len() > 1 || self_loop {
                let mut groups: Vec<Group> = component
                    .iter()
                    .map(|name| Group::named(name.to_string()))
                    .collect();
                groups.sort();
                log::warn!("Cyclic group definition: {:?}", groups);
                return Err(DefinitionError::CyclicGroupDefinition { groups });
            }
        }

        Ok(())
    }

    /// Number of groups with declared parents.
    pub fn inheritance_len(&self) -> usize {
        self.parents.len()
    }

    /// Number of named sequences.
    pub fn sequence_len(&self) -> usize {
        self.sequences.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(name: &'static str) -> Group {
        Group::named(name)
    }

    #[test]
    fn test_ancestors_are_transitive() {
        let mut catalog = GroupCatalog::new();
        catalog.extend(g("Strict"), vec![g("Basic")]);
        catalog.extend(g("Basic"), vec![g("Minimal")]);

        let ancestors = catalog.ancestors(&g("Strict"));
        assert_eq!(ancestors.len(), 2);
        assert!(ancestors.contains(&g("Basic")));
        assert!(ancestors.contains(&g("Minimal")));

        let batch = catalog.batch_for(&g("Strict"));
        assert_eq!(batch.primary(), &g("Strict"));
        assert_eq!(batch.groups().len(), 3);
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let mut catalog = GroupCatalog::new();
        catalog.extend(g("A"), vec![g("B"), g("D")]);
        catalog.extend(g("B"), vec![g("C")]);

        assert_eq!(catalog.ancestors(&g("A")), vec![g("B"), g("D"), g("C")]);
    }

    #[test]
    fn test_plain_group_batch() {
        let catalog = GroupCatalog::new();
        assert_eq!(catalog.batch_for(&Group::DEFAULT), GroupBatch::single(Group::DEFAULT));
    }

    #[test]
    fn test_duplicate_sequence() {
        let mut catalog = GroupCatalog::new();
        catalog.define_sequence(g("Checkout"), vec![g("Cart"), g("Payment")]).unwrap();
        let result = catalog.define_sequence(g("Checkout"), vec![g("Cart")]);
        assert!(matches!(result, Err(DefinitionError::DuplicateSequence(_))));
    }

    #[test]
    fn test_empty_named_sequence() {
        let mut catalog = GroupCatalog::new();
        let result = catalog.define_sequence(g("Nothing"), Vec::new());
        assert!(matches!(result, Err(DefinitionError::EmptySequence)));
    }

    #[test]
    fn test_sequence_named_default_rejected() {
        let mut catalog = GroupCatalog::new();
        catalog.define_sequence(Group::DEFAULT, vec![g("Cart")]).unwrap();
        match catalog.verify() {
            Err(DefinitionError::ReservedSequenceName(name)) => assert!(name.is_default()),
            other => panic!("expected a reserved name error, got {:?}", other),
        }
    }

    #[test]
    fn test_sequence_named_own_group_rejected() {
        struct Order;
        let own = Group::of::<Order>();

        let mut catalog = GroupCatalog::new();
        catalog.define_sequence(own.clone(), vec![g("Cart")]).unwrap();
        assert!(catalog.verify().is_ok());

        let result = catalog.verify_with_own_groups([&own]);
        assert!(matches!(
            result,
            Err(DefinitionError::ReservedSequenceName(name)) if name == own
        ));
    }

    #[test]
    fn test_inheritance_cycle_detected() {
        let mut catalog = GroupCatalog::new();
        catalog.extend(g("A"), vec![g("B")]);
        catalog.extend(g("B"), vec![g("A")]);

        match catalog.verify() {
            Err(DefinitionError::CyclicGroupDefinition { groups }) => {
                assert_eq!(groups, vec![g("A"), g("B")]);
            }
            other => panic!("expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_sequence_cycle_detected() {
        let mut catalog = GroupCatalog::new();
        catalog.define_sequence(g("Outer"), vec![g("Inner")]).unwrap();
        catalog.define_sequence(g("Inner"), vec![g("Outer")]).unwrap();
        assert!(catalog.verify().is_err());
    }

    #[test]
    fn test_acyclic_catalog_verifies() {
        let mut catalog = GroupCatalog::new();
        catalog.extend(g("Strict"), vec![g("Basic")]);
        catalog.define_sequence(g("Full"), vec![g("Basic"), g("Strict")]).unwrap();
        assert!(catalog.verify().is_ok());
        assert_eq!(catalog.sequence_len(), 1);
        assert_eq!(catalog.inheritance_len(), 1);
    }
}
