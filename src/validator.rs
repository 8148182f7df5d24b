//! Validator entry points.
//!
//! A [`Validator`] is built once from registered type metadata, a group
//! catalog and options, then shared between threads. Each call resolves the
//! requested groups for the instance, then walks the resolved order:
//!
//! ```rust,ignore
//! let validator = Validator::builder()
//!     .register(user_metadata())
//!     .options(ValidatorOptions::from_file("sequent.toml")?)
//!     .build()?;
//!
//! let violations = validator.validate_object(&user, &[])?;
//! for line in violations.detailed() {
//!     println!("{}", line);
//! }
//! ```

use crate::config::ValidatorOptions;
use crate::core::error::{DefinitionError, DefinitionResult, ValidatorError, ValidatorResult};
use crate::core::group::Group;
use crate::core::instance::{InstanceRef, TypeKey, Validatable};
use crate::core::value::Value;
use crate::core::violation::ViolationSet;
use crate::groups::catalog::GroupCatalog;
use crate::groups::resolver::{GroupSequenceResolver, ValidationOrder};
use crate::metadata::bean::TypeMetadata;
use crate::metadata::registry::MetadataRegistry;
use crate::validation::evaluator::{ConstraintEvaluator, EvaluationContext, Scope};
use crate::validation::interpolator::{AttributeInterpolator, MessageInterpolator};
use crate::validation::orchestrator::ValidationOrchestrator;
use rayon::prelude::*;
use std::sync::Arc;

/// Validates instances of registered types.
#[derive(Debug)]
pub struct Validator {
    registry: MetadataRegistry,
    resolver: GroupSequenceResolver,
    orchestrator: ValidationOrchestrator,
    options: ValidatorOptions,
}

impl Validator {
    /// Create a new validator builder.
    pub fn builder() -> ValidatorBuilder {
        ValidatorBuilder::new()
    }

    /// The options this validator was built with.
    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    /// The metadata registry.
    pub fn registry(&self) -> &MetadataRegistry {
        &self.registry
    }

    /// Metadata used for `T`.
    pub fn metadata_for<T: Validatable>(&self) -> Arc<TypeMetadata> {
        self.registry.get_or_unconstrained(TypeKey::of::<T>())
    }

    /// Resolve the evaluation order of `groups` for `instance` without
    /// evaluating anything.
    pub fn resolve<T: Validatable>(
        &self,
        instance: &T,
        groups: &[Group],
    ) -> DefinitionResult<ValidationOrder> {
        let metadata = self.metadata_for::<T>();
        self.resolver
            .resolve(&metadata, InstanceRef::new(instance), groups)
    }

    /// Validate class-level and property constraints of `instance`.
    ///
    /// An empty `groups` slice means Default.
    pub fn validate_object<T: Validatable>(
        &self,
        instance: &T,
        groups: &[Group],
    ) -> ValidatorResult<ViolationSet> {
        self.validate(InstanceRef::new(instance), Scope::Object, groups)
    }

    /// Validate the constraints of one property of `instance`.
    ///
    /// Fails with [`ValidatorError::UnknownProperty`] if the instance does not
    /// expose `property`.
    pub fn validate_property<T: Validatable>(
        &self,
        instance: &T,
        property: &str,
        groups: &[Group],
    ) -> ValidatorResult<ViolationSet> {
        self.validate(
            InstanceRef::new(instance),
            Scope::Property(property.to_string()),
            groups,
        )
    }

    /// Validate `value` as the return value of `method` called on `instance`.
    pub fn validate_return_value<T: Validatable>(
        &self,
        instance: &T,
        method: &str,
        value: &Value,
        groups: &[Group],
    ) -> ValidatorResult<ViolationSet> {
        self.validate(
            InstanceRef::new(instance),
            Scope::ReturnValue {
                method: method.to_string(),
                value: value.clone(),
            },
            groups,
        )
    }

    /// Validate many instances of the same type in parallel.
    ///
    /// Results are in input order; one failing instance does not affect the
    /// others.
    pub fn validate_objects<T: Validatable>(
        &self,
        instances: &[T],
        groups: &[Group],
    ) -> Vec<ValidatorResult<ViolationSet>> {
        instances
            .par_iter()
            .map(|instance| self.validate_object(instance, groups))
            .collect()
    }

    fn validate(
        &self,
        instance: InstanceRef<'_>,
        scope: Scope,
        groups: &[Group],
    ) -> ValidatorResult<ViolationSet> {
        let metadata = self.registry.get_or_unconstrained(instance.key());

        // Resolution comes first: a broken definition must fail before any
        // predicate runs.
        let order = self.resolver.resolve(&metadata, instance, groups)?;

        if let Scope::Property(name) = &scope {
            if instance.validatable().property(name).is_none() {
                return Err(ValidatorError::UnknownProperty {
                    type_name: metadata.type_name(),
                    property: name.clone(),
                });
            }
        }

        let mut context = EvaluationContext::new(&metadata, instance, scope);
        self.orchestrator.run(&mut context, &order)
    }
}

/// Builder for [`Validator`].
pub struct ValidatorBuilder {
    registry: MetadataRegistry,
    catalog: GroupCatalog,
    options: ValidatorOptions,
    interpolator: Arc<dyn MessageInterpolator>,
    pending_error: Option<DefinitionError>,
}

impl ValidatorBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            registry: MetadataRegistry::new(),
            catalog: GroupCatalog::new(),
            options: ValidatorOptions::default(),
            interpolator: Arc::new(AttributeInterpolator),
            pending_error: None,
        }
    }

    /// Register constraint metadata for a type.
    pub fn register(mut self, metadata: TypeMetadata) -> Self {
        self.registry.register(metadata);
        self
    }

    /// Declare that validating `group` also validates `parents`.
    pub fn extend_group(mut self, group: Group, parents: impl IntoIterator<Item = Group>) -> Self {
        self.catalog.extend(group, parents);
        self
    }

    /// Define a named group that stands for a sequence of groups.
    pub fn define_sequence(mut self, name: Group, groups: impl IntoIterator<Item = Group>) -> Self {
        if let Err(err) = self.catalog.define_sequence(name, groups) {
            self.pending_error.get_or_insert(err);
        }
        self
    }

    /// Set validator options.
    pub fn options(mut self, options: ValidatorOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the message interpolator.
    pub fn interpolator<I>(mut self, interpolator: I) -> Self
    where
        I: MessageInterpolator + 'static,
    {
        self.interpolator = Arc::new(interpolator);
        self
    }

    /// Build the validator, checking the group catalog against the
    /// registered types.
    pub fn build(self) -> Result<Validator, DefinitionError> {
        if let Some(err) = self.pending_error {
            return Err(err);
        }
        self.catalog
            .verify_with_own_groups(self.registry.own_groups())?;

        let resolver = GroupSequenceResolver::new(Arc::new(self.catalog))
            .with_memoization(self.options.memoize_bindings);
        let orchestrator = ValidationOrchestrator::new(ConstraintEvaluator::new(self.interpolator))
            .with_fail_fast(self.options.fail_fast);

        log::debug!(
            "Built validator for {} type(s) with {:?}",
            self.registry.len(),
            self.options
        );

        Ok(Validator {
            registry: self.registry,
            resolver,
            orchestrator,
            options: self.options,
        })
    }
}

impl Default for ValidatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
