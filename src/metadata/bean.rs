//! Constraint metadata of a validated type.
//!
//! Metadata is declared once through [`TypeMetadataBuilder`] and is immutable
//! afterwards. It holds everything the engine needs to know about a type:
//! its constraints, and how its Default group is redefined (a static
//! sequence, a provider, or neither).

use crate::core::constraint::{ConstrainedElement, Constraint, ConstraintDescriptor};
use crate::core::group::Group;
use crate::core::instance::{TypeKey, Validatable};
use crate::groups::provider::{ErasedProvider, GroupSequenceProvider, TypedProvider};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Constraint metadata for one type.
#[derive(Clone)]
pub struct TypeMetadata {
    key: TypeKey,
    own_group: Group,
    constraints: Vec<ConstraintDescriptor>,
    default_sequence: Option<Vec<Group>>,
    provider: Option<Arc<dyn ErasedProvider>>,
}

impl TypeMetadata {
    /// Create a new metadata builder for `T`.
    pub fn builder<T: Validatable>() -> TypeMetadataBuilder<T> {
        TypeMetadataBuilder::new()
    }

    /// Metadata of a type nothing was declared for.
    pub fn unconstrained(key: TypeKey) -> Self {
        Self {
            key,
            own_group: Group::named(key.name()),
            constraints: Vec::new(),
            default_sequence: None,
            provider: None,
        }
    }

    /// Type token.
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Full type path.
    pub fn type_name(&self) -> &'static str {
        self.key.name()
    }

    /// The type's own group; inside a redefined default sequence it stands for
    /// the type's Default constraints.
    pub fn own_group(&self) -> &Group {
        &self.own_group
    }

    /// All declared constraints.
    pub fn constraints(&self) -> &[ConstraintDescriptor] {
        &self.constraints
    }

    /// Statically declared default group sequence, as declared (unchecked).
    pub fn default_sequence(&self) -> Option<&[Group]> {
        self.default_sequence.as_deref()
    }

    /// Registered default group sequence provider.
    pub fn provider(&self) -> Option<&Arc<dyn ErasedProvider>> {
        self.provider.as_ref()
    }

    /// Check if the Default group of this type is redefined in any way.
    pub fn redefines_default(&self) -> bool {
        self.default_sequence.is_some() || self.provider.is_some()
    }

    /// Check if any constraint is declared on `property`.
    pub fn constrains_property(&self, property: &str) -> bool {
        self.constraints
            .iter()
            .any(|c| matches!(&c.element, ConstrainedElement::Property(name) if name == property))
    }

    /// Names of constrained properties, in declaration order.
    pub fn property_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for descriptor in &self.constraints {
            if let ConstrainedElement::Property(name) = &descriptor.element {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Every group mentioned by a constraint of this type.
    pub fn groups(&self) -> Vec<&Group> {
        let mut groups: Vec<&Group> = Vec::new();
        for group in self.constraints.iter().flat_map(|c| c.groups.iter()) {
            if !groups.contains(&group) {
                groups.push(group);
            }
        }
        groups
    }
}

impl fmt::Debug for TypeMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeMetadata")
            .field("type", &self.key.name())
            .field("constraints", &self.constraints.len())
            .field("default_sequence", &self.default_sequence)
            .field(
                "provider",
                &self.provider.as_ref().map(|p| p.provider_name()),
            )
            .finish()
    }
}

/// Builder for [`TypeMetadata`].
///
/// ```rust,ignore
/// let metadata = TypeMetadata::builder::<User>()
///     .property("password", Constraint::pattern(r"\w+")?)
///     .property_in("password", Constraint::Length { min: 10, max: 20 }, [strong()])
///     .group_sequence_provider(UserSequenceProvider)
///     .build();
/// ```
pub struct TypeMetadataBuilder<T> {
    constraints: Vec<ConstraintDescriptor>,
    default_sequence: Option<Vec<Group>>,
    provider: Option<Arc<dyn ErasedProvider>>,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Validatable> TypeMetadataBuilder<T> {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            constraints: Vec::new(),
            default_sequence: None,
            provider: None,
            _marker: PhantomData,
        }
    }

    /// Add a fully specified constraint.
    pub fn constraint(mut self, descriptor: ConstraintDescriptor) -> Self {
        self.constraints.push(descriptor);
        self
    }

    /// Add a class-level constraint in the Default group.
    pub fn class_level(self, constraint: Constraint) -> Self {
        self.constraint(ConstraintDescriptor::new(ConstrainedElement::Type, constraint))
    }

    /// Add a property constraint in the Default group.
    pub fn property(self, name: impl Into<String>, constraint: Constraint) -> Self {
        self.constraint(ConstraintDescriptor::new(
            ConstrainedElement::Property(name.into()),
            constraint,
        ))
    }

    /// Add a property constraint in the given groups.
    pub fn property_in(
        self,
        name: impl Into<String>,
        constraint: Constraint,
        groups: impl IntoIterator<Item = Group>,
    ) -> Self {
        self.constraint(
            ConstraintDescriptor::new(ConstrainedElement::Property(name.into()), constraint)
                .in_groups(groups),
        )
    }

    /// Add a return value constraint in the Default group.
    pub fn return_value(self, method: impl Into<String>, constraint: Constraint) -> Self {
        self.constraint(ConstraintDescriptor::new(
            ConstrainedElement::ReturnValue(method.into()),
            constraint,
        ))
    }

    /// Add a return value constraint in the given groups.
    pub fn return_value_in(
        self,
        method: impl Into<String>,
        constraint: Constraint,
        groups: impl IntoIterator<Item = Group>,
    ) -> Self {
        self.constraint(
            ConstraintDescriptor::new(ConstrainedElement::ReturnValue(method.into()), constraint)
                .in_groups(groups),
        )
    }

    /// Redefine the Default group of `T` with a fixed sequence.
    ///
    /// The sequence must contain `Group::of::<T>()`. It is checked the first
    /// time the type is validated.
    pub fn default_group_sequence(mut self, groups: impl IntoIterator<Item = Group>) -> Self {
        self.default_sequence = Some(groups.into_iter().collect());
        self
    }

    /// Redefine the Default group of `T` per instance with a provider.
    pub fn group_sequence_provider<P>(mut self, provider: P) -> Self
    where
        P: GroupSequenceProvider<T> + 'static,
    {
        self.provider = Some(Arc::new(TypedProvider::<T, P>::new(provider)));
        self
    }

    /// Build the metadata.
    pub fn build(self) -> TypeMetadata {
        let key = TypeKey::of::<T>();
        TypeMetadata {
            key,
            own_group: Group::of::<T>(),
            constraints: self.constraints,
            default_sequence: self.default_sequence,
            provider: self.provider,
        }
    }
}

impl<T: Validatable> Default for TypeMetadataBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::Value;

    struct Shipment {
        code: Option<String>,
    }

    impl Validatable for Shipment {
        fn property(&self, name: &str) -> Option<Value> {
            match name {
                "code" => Some(self.code.clone().into()),
                _ => None,
            }
        }
    }

    #[test]
    fn test_builder_collects_constraints() {
        let metadata = TypeMetadata::builder::<Shipment>()
            .property("code", Constraint::NotNull)
            .property_in(
                "code",
                Constraint::Length { min: 4, max: 8 },
                [Group::named("Customs")],
            )
            .return_value("weight", Constraint::Range { min: 0.0, max: 100.0 })
            .build();

        assert_eq!(metadata.constraints().len(), 3);
        assert!(metadata.constrains_property("code"));
        assert!(!metadata.constrains_property("weight"));
        assert_eq!(metadata.property_names(), vec!["code"]);
        assert_eq!(metadata.groups().len(), 2);
        assert!(!metadata.redefines_default());
    }

    #[test]
    fn test_own_group_is_type_token() {
        let metadata = TypeMetadata::builder::<Shipment>().build();
        assert_eq!(metadata.own_group(), &Group::of::<Shipment>());
        assert_eq!(metadata.key(), TypeKey::of::<Shipment>());
    }

    #[test]
    fn test_provider_registration() {
        let metadata = TypeMetadata::builder::<Shipment>()
            .group_sequence_provider(|_: &Shipment| -> anyhow::Result<Vec<Group>> {
                Ok(vec![Group::of::<Shipment>()])
            })
            .build();

        assert!(metadata.redefines_default());
        assert!(metadata.provider().is_some());
        assert!(metadata.default_sequence().is_none());
    }

    #[test]
    fn test_unconstrained() {
        let metadata = TypeMetadata::unconstrained(TypeKey::of::<Shipment>());
        assert!(metadata.constraints().is_empty());
        assert_eq!(metadata.own_group(), &Group::of::<Shipment>());
    }
}
