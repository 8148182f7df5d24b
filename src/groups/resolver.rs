//! Group sequence resolution.
//!
//! Turns the groups requested by a caller into the order in which batches of
//! groups are evaluated. Two compositions exist and are kept apart in the
//! result:
//!
//! - a **sequence** is evaluated batch by batch and stops at the first batch
//!   that produces a violation;
//! - independent **groups** are all evaluated and their violations unioned.
//!
//! Requesting Default on a type that redefines it (statically or through a
//! provider) yields a sequence. The binding of a type to its strategy is
//! memoized; provider output never is, since it may depend on the instance.

use crate::core::error::{DefinitionError, DefinitionResult};
use crate::core::group::{Group, GroupBatch, GroupSequence};
use crate::core::instance::{InstanceRef, TypeKey};
use crate::groups::catalog::GroupCatalog;
use crate::groups::provider::{ErasedProvider, ProviderInvoker};
use crate::metadata::bean::TypeMetadata;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// How the Default group of a type is resolved.
#[derive(Clone)]
pub enum DefaultBinding {
    /// Default is not redefined.
    Plain,
    /// Default is replaced by a fixed sequence.
    Static(GroupSequence),
    /// Default is replaced by the output of a provider, per instance.
    Provider(Arc<dyn ErasedProvider>),
}

impl fmt::Debug for DefaultBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultBinding::Plain => write!(f, "Plain"),
            DefaultBinding::Static(seq) => f.debug_tuple("Static").field(seq).finish(),
            DefaultBinding::Provider(p) => f.debug_tuple("Provider").field(&p.provider_name()).finish(),
        }
    }
}

/// One member of a resolved order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderMember {
    /// A single batch, evaluated independently of the other members.
    Group(GroupBatch),
    /// Batches evaluated in order, stopping at the first failing batch.
    Sequence(Vec<GroupBatch>),
}

impl OrderMember {
    /// The batches of this member, in evaluation order.
    pub fn batches(&self) -> &[GroupBatch] {
        match self {
            OrderMember::Group(batch) => std::slice::from_ref(batch),
            OrderMember::Sequence(batches) => batches,
        }
    }

    /// Check if this member short-circuits.
    pub fn is_sequence(&self) -> bool {
        matches!(self, OrderMember::Sequence(_))
    }
}

impl fmt::Display for OrderMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderMember::Group(batch) => write!(f, "{}", batch),
            OrderMember::Sequence(batches) => {
                let parts: Vec<String> = batches.iter().map(|b| b.to_string()).collect();
                write!(f, "[{}]", parts.join(" -> "))
            }
        }
    }
}

/// The resolved evaluation order for one validation call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOrder {
    members: Vec<OrderMember>,
}

impl ValidationOrder {
    /// Independent members of the order.
    pub fn members(&self) -> &[OrderMember] {
        &self.members
    }

    /// Every batch across all members, as plain group lists.
    pub fn batch_groups(&self) -> Vec<Vec<Group>> {
        self.members
            .iter()
            .flat_map(|m| m.batches())
            .map(|b| b.groups().to_vec())
            .collect()
    }

    /// Check if the order is empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn push(&mut self, member: OrderMember) {
        if !self.members.contains(&member) {
            self.members.push(member);
        }
    }
}

impl fmt::Display for ValidationOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.members.iter().map(|m| m.to_string()).collect();
        write!(f, "{}", parts.join(" | "))
    }
}

/// Resolves requested groups into a [`ValidationOrder`].
pub struct GroupSequenceResolver {
    catalog: Arc<GroupCatalog>,
    /// Memoized type bindings; the only shared mutable state of the engine.
    bindings: RwLock<HashMap<TypeKey, Arc<DefaultBinding>>>,
    memoize: bool,
    invoker: ProviderInvoker,
}

impl GroupSequenceResolver {
    /// Create a resolver over a group catalog.
    pub fn new(catalog: Arc<GroupCatalog>) -> Self {
        Self {
            catalog,
            bindings: RwLock::new(HashMap::new()),
            memoize: true,
            invoker: ProviderInvoker,
        }
    }

    /// Enable or disable memoization of type bindings.
    pub fn with_memoization(mut self, memoize: bool) -> Self {
        self.memoize = memoize;
        self
    }

    /// The group catalog.
    pub fn catalog(&self) -> &GroupCatalog {
        &self.catalog
    }

    /// Number of memoized bindings.
    pub fn cached_bindings(&self) -> usize {
        self.bindings.read().len()
    }

    /// Drop all memoized bindings.
    pub fn clear_bindings(&self) {
        self.bindings.write().clear();
    }

    /// Get the Default binding of a type, computing it on first use.
    ///
    /// Concurrent first use may compute the binding more than once; the
    /// computation is deterministic and the first stored value wins.
    pub fn binding(&self, metadata: &TypeMetadata) -> DefinitionResult<Arc<DefaultBinding>> {
        let key = metadata.key();

        if self.memoize {
            if let Some(binding) = self.bindings.read().get(&key) {
                return Ok(Arc::clone(binding));
            }
        }

        let binding = Arc::new(compute_binding(metadata)?);
        log::debug!("Bound default group of {} to {:?}", key, binding);

        if self.memoize {
            let mut bindings = self.bindings.write();
            Ok(Arc::clone(bindings.entry(key).or_insert(binding)))
        } else {
            Ok(binding)
        }
    }

    /// Resolve `requested` groups for an instance of the type `metadata` describes.
    ///
    /// An empty request means Default. Raises a [`DefinitionError`] if the
    /// type's default sequence is malformed; nothing is evaluated in that case.
    pub fn resolve(
        &self,
        metadata: &TypeMetadata,
        instance: InstanceRef<'_>,
        requested: &[Group],
    ) -> DefinitionResult<ValidationOrder> {
        let binding = self.binding(metadata)?;
        let mut expansion = Expansion {
            catalog: &self.catalog,
            invoker: &self.invoker,
            metadata,
            instance,
            binding: &binding,
            redefined: None,
        };

        let mut order = ValidationOrder::default();
        let default_only = [Group::DEFAULT];
        let requested = if requested.is_empty() {
            &default_only[..]
        } else {
            requested
        };

        for group in requested {
            let member = if group.is_default() {
                match binding.as_ref() {
                    DefaultBinding::Plain => OrderMember::Group(self.catalog.batch_for(group)),
                    _ => {
                        let mut batches = Vec::new();
                        expansion.expand_redefined_default(&mut batches)?;
                        OrderMember::Sequence(batches)
                    }
                }
            } else if group == metadata.own_group() {
                OrderMember::Group(self.catalog.batch_for(&Group::DEFAULT))
            } else if self.catalog.is_sequence(group) {
                let mut batches = Vec::new();
                expansion.expand(group, false, &mut batches)?;
                OrderMember::Sequence(batches)
            } else {
                OrderMember::Group(self.catalog.batch_for(group))
            };
            order.push(member);
        }

        log::debug!(
            "Resolved groups {:?} for {} into {}",
            requested.iter().map(|g| g.to_string()).collect::<Vec<_>>(),
            metadata.type_name(),
            order
        );

        Ok(order)
    }
}

impl fmt::Debug for GroupSequenceResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupSequenceResolver")
            .field("cached_bindings", &self.cached_bindings())
            .field("memoize", &self.memoize)
            .finish()
    }
}

/// Call-local state while expanding sequences for one instance.
struct Expansion<'a> {
    catalog: &'a GroupCatalog,
    invoker: &'a ProviderInvoker,
    metadata: &'a TypeMetadata,
    instance: InstanceRef<'a>,
    binding: &'a DefaultBinding,
    /// The redefined default sequence, computed at most once per call.
    redefined: Option<GroupSequence>,
}

impl Expansion<'_> {
    fn redefined_default(&mut self) -> DefinitionResult<GroupSequence> {
        if let Some(seq) = &self.redefined {
            return Ok(seq.clone());
        }

        let seq = match self.binding {
            DefaultBinding::Plain => GroupSequence::new(vec![self.metadata.own_group().clone()])?,
            DefaultBinding::Static(seq) => seq.clone(),
            DefaultBinding::Provider(provider) => {
                let seq = self.invoker.invoke(provider.as_ref(), self.instance)?;
                check_redefined_sequence(self.metadata, &seq)?;
                seq
            }
        };

        self.redefined = Some(seq.clone());
        Ok(seq)
    }

    fn expand_redefined_default(&mut self, out: &mut Vec<GroupBatch>) -> DefinitionResult<()> {
        let seq = self.redefined_default()?;
        for group in &seq {
            self.expand(group, true, out)?;
        }
        Ok(())
    }

    /// Append the batches `group` stands for when it appears inside a sequence.
    fn expand(
        &mut self,
        group: &Group,
        in_redefined_default: bool,
        out: &mut Vec<GroupBatch>,
    ) -> DefinitionResult<()> {
        if group == self.metadata.own_group() {
            out.push(self.catalog.batch_for(&Group::DEFAULT));
        } else if group.is_default() {
            if in_redefined_default {
                return Err(DefinitionError::DefaultInRedefinedSequence {
                    type_name: self.metadata.type_name(),
                });
            }
            match self.binding {
                DefaultBinding::Plain => out.push(self.catalog.batch_for(group)),
                _ => self.expand_redefined_default(out)?,
            }
        } else if let Some(seq) = self.catalog.sequence(group).cloned() {
            // The catalog is verified acyclic, so this terminates.
            for member in &seq {
                self.expand(member, in_redefined_default, out)?;
            }
        } else {
            out.push(self.catalog.batch_for(group));
        }
        Ok(())
    }
}

fn compute_binding(metadata: &TypeMetadata) -> DefinitionResult<DefaultBinding> {
    match (metadata.default_sequence(), metadata.provider()) {
        (Some(_), Some(_)) => {
            log::warn!(
                "{} declares both a default group sequence and a provider",
                metadata.type_name()
            );
            Err(DefinitionError::ConflictingDefaultSequence {
                type_name: metadata.type_name(),
            })
        }
        (Some(groups), None) => {
            let seq = GroupSequence::new(groups.to_vec())?;
            check_redefined_sequence(metadata, &seq)?;
            Ok(DefaultBinding::Static(seq))
        }
        (None, Some(provider)) => Ok(DefaultBinding::Provider(Arc::clone(provider))),
        (None, None) => Ok(DefaultBinding::Plain),
    }
}

/// A redefined default sequence must name the type's own group and must not
/// name Default.
fn check_redefined_sequence(metadata: &TypeMetadata, seq: &GroupSequence) -> DefinitionResult<()> {
    if seq.contains(&Group::DEFAULT) {
        log::warn!("Default group in redefined sequence {} of {}", seq, metadata.type_name());
        return Err(DefinitionError::DefaultInRedefinedSequence {
            type_name: metadata.type_name(),
        });
    }
    if !seq.contains(metadata.own_group()) {
        log::warn!("Own group missing from redefined sequence {} of {}", seq, metadata.type_name());
        return Err(DefinitionError::MissingOwnGroup {
            type_name: metadata.type_name(),
            group: metadata.own_group().clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constraint::Constraint;
    use crate::core::instance::Validatable;
    use crate::core::value::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Order {
        express: bool,
    }

    impl Validatable for Order {
        fn property(&self, name: &str) -> Option<Value> {
            match name {
                "express" => Some(Value::Boolean(self.express)),
                _ => None,
            }
        }
    }

    fn express() -> Group {
        Group::named("Express")
    }

    fn resolver() -> GroupSequenceResolver {
        GroupSequenceResolver::new(Arc::new(GroupCatalog::new()))
    }

    fn provider_metadata() -> TypeMetadata {
        TypeMetadata::builder::<Order>()
            .property("express", Constraint::NotNull)
            .group_sequence_provider(|order: &Order| -> anyhow::Result<Vec<Group>> {
                if order.express {
                    Ok(vec![express(), Group::of::<Order>()])
                } else {
                    Ok(vec![Group::of::<Order>()])
                }
            })
            .build()
    }

    #[test]
    fn test_plain_default() {
        let metadata = TypeMetadata::builder::<Order>().build();
        let order = Order { express: false };

        let resolved = resolver()
            .resolve(&metadata, InstanceRef::new(&order), &[Group::DEFAULT])
            .unwrap();
        assert_eq!(resolved.batch_groups(), vec![vec![Group::DEFAULT]]);
        assert!(!resolved.members()[0].is_sequence());
    }

    #[test]
    fn test_empty_request_means_default() {
        let metadata = TypeMetadata::builder::<Order>().build();
        let order = Order { express: false };

        let resolved = resolver()
            .resolve(&metadata, InstanceRef::new(&order), &[])
            .unwrap();
        assert_eq!(resolved.batch_groups(), vec![vec![Group::DEFAULT]]);
    }

    #[test]
    fn test_provider_output_depends_on_instance() {
        let metadata = provider_metadata();
        let resolver = resolver();

        let normal = Order { express: false };
        let rush = Order { express: true };

        let normal_order = resolver
            .resolve(&metadata, InstanceRef::new(&normal), &[Group::DEFAULT])
            .unwrap();
        let rush_order = resolver
            .resolve(&metadata, InstanceRef::new(&rush), &[Group::DEFAULT])
            .unwrap();

        assert_eq!(normal_order.batch_groups(), vec![vec![Group::DEFAULT]]);
        assert_eq!(
            rush_order.batch_groups(),
            vec![vec![express()], vec![Group::DEFAULT]]
        );
        assert!(rush_order.members()[0].is_sequence());
    }

    #[test]
    fn test_static_sequence() {
        let metadata = TypeMetadata::builder::<Order>()
            .default_group_sequence([Group::of::<Order>(), express()])
            .build();
        let order = Order { express: false };

        let resolved = resolver()
            .resolve(&metadata, InstanceRef::new(&order), &[])
            .unwrap();
        assert_eq!(
            resolved.batch_groups(),
            vec![vec![Group::DEFAULT], vec![express()]]
        );
    }

    #[test]
    fn test_static_and_provider_conflict() {
        let metadata = TypeMetadata::builder::<Order>()
            .default_group_sequence([Group::of::<Order>()])
            .group_sequence_provider(|_: &Order| -> anyhow::Result<Vec<Group>> {
                Ok(vec![Group::of::<Order>()])
            })
            .build();
        let order = Order { express: false };

        let result = resolver().resolve(&metadata, InstanceRef::new(&order), &[]);
        assert!(matches!(
            result,
            Err(DefinitionError::ConflictingDefaultSequence { .. })
        ));
    }

    #[test]
    fn test_missing_own_group() {
        let metadata = TypeMetadata::builder::<Order>()
            .group_sequence_provider(|_: &Order| -> anyhow::Result<Vec<Group>> {
                Ok(vec![express()])
            })
            .build();
        let order = Order { express: false };

        let result = resolver().resolve(&metadata, InstanceRef::new(&order), &[]);
        assert!(matches!(result, Err(DefinitionError::MissingOwnGroup { .. })));
    }

    #[test]
    fn test_default_inside_static_sequence() {
        let metadata = TypeMetadata::builder::<Order>()
            .default_group_sequence([Group::DEFAULT, Group::of::<Order>()])
            .build();
        let order = Order { express: false };

        let result = resolver().resolve(&metadata, InstanceRef::new(&order), &[]);
        assert!(matches!(
            result,
            Err(DefinitionError::DefaultInRedefinedSequence { .. })
        ));
    }

    #[test]
    fn test_default_returned_by_provider() {
        let metadata = TypeMetadata::builder::<Order>()
            .group_sequence_provider(|_: &Order| -> anyhow::Result<Vec<Group>> {
                Ok(vec![Group::DEFAULT, Group::of::<Order>()])
            })
            .build();
        let order = Order { express: true };

        let result = resolver().resolve(&metadata, InstanceRef::new(&order), &[]);
        assert!(matches!(
            result,
            Err(DefinitionError::DefaultInRedefinedSequence { .. })
        ));
    }

    #[test]
    fn test_default_reached_through_named_sequence_in_redefinition() {
        let mut catalog = GroupCatalog::new();
        catalog
            .define_sequence(Group::named("Loop"), vec![Group::DEFAULT])
            .unwrap();
        let resolver = GroupSequenceResolver::new(Arc::new(catalog));

        let metadata = TypeMetadata::builder::<Order>()
            .default_group_sequence([Group::of::<Order>(), Group::named("Loop")])
            .build();
        let order = Order { express: false };

        let result = resolver.resolve(&metadata, InstanceRef::new(&order), &[]);
        assert!(matches!(
            result,
            Err(DefinitionError::DefaultInRedefinedSequence { .. })
        ));
    }

    #[test]
    fn test_requested_groups_are_independent() {
        let metadata = provider_metadata();
        let order = Order { express: true };

        let resolved = resolver()
            .resolve(
                &metadata,
                InstanceRef::new(&order),
                &[Group::DEFAULT, Group::named("Audit"), Group::named("Audit")],
            )
            .unwrap();

        assert_eq!(resolved.members().len(), 2);
        assert!(resolved.members()[0].is_sequence());
        assert_eq!(
            resolved.members()[1],
            OrderMember::Group(GroupBatch::single(Group::named("Audit")))
        );
    }

    #[test]
    fn test_named_sequence_expands_default_substitution() {
        let mut catalog = GroupCatalog::new();
        catalog
            .define_sequence(Group::named("Checkout"), vec![Group::DEFAULT, Group::named("Billing")])
            .unwrap();
        let resolver = GroupSequenceResolver::new(Arc::new(catalog));
        let metadata = provider_metadata();
        let order = Order { express: true };

        let resolved = resolver
            .resolve(&metadata, InstanceRef::new(&order), &[Group::named("Checkout")])
            .unwrap();

        assert_eq!(
            resolved.batch_groups(),
            vec![
                vec![express()],
                vec![Group::DEFAULT],
                vec![Group::named("Billing")]
            ]
        );
    }

    #[test]
    fn test_inherited_groups_share_a_batch() {
        let mut catalog = GroupCatalog::new();
        catalog.extend(Group::named("Strict"), vec![Group::named("Basic")]);
        let resolver = GroupSequenceResolver::new(Arc::new(catalog));
        let metadata = TypeMetadata::builder::<Order>().build();
        let order = Order { express: false };

        let resolved = resolver
            .resolve(&metadata, InstanceRef::new(&order), &[Group::named("Strict")])
            .unwrap();
        assert_eq!(
            resolved.batch_groups(),
            vec![vec![Group::named("Strict"), Group::named("Basic")]]
        );
    }

    #[test]
    fn test_binding_memoized_but_provider_called_each_time() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let metadata = TypeMetadata::builder::<Order>()
            .group_sequence_provider(move |_: &Order| -> anyhow::Result<Vec<Group>> {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(vec![Group::of::<Order>()])
            })
            .build();
        let resolver = resolver();
        let order = Order { express: false };

        for _ in 0..3 {
            resolver
                .resolve(&metadata, InstanceRef::new(&order), &[])
                .unwrap();
        }

        assert_eq!(resolver.cached_bindings(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        resolver.clear_bindings();
        assert_eq!(resolver.cached_bindings(), 0);
    }

    #[test]
    fn test_memoization_disabled() {
        let metadata = TypeMetadata::builder::<Order>().build();
        let resolver = resolver().with_memoization(false);
        let order = Order { express: false };

        resolver
            .resolve(&metadata, InstanceRef::new(&order), &[])
            .unwrap();
        assert_eq!(resolver.cached_bindings(), 0);
    }

    #[test]
    fn test_non_default_request_skips_provider() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let metadata = TypeMetadata::builder::<Order>()
            .group_sequence_provider(move |_: &Order| -> anyhow::Result<Vec<Group>> {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(vec![Group::of::<Order>()])
            })
            .build();
        let order = Order { express: false };

        resolver()
            .resolve(&metadata, InstanceRef::new(&order), &[express()])
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
