//! Constraint evaluation for one batch of groups.

use crate::core::constraint::{ConstrainedElement, ConstraintDescriptor};
use crate::core::error::{ValidatorError, ValidatorResult};
use crate::core::group::GroupBatch;
use crate::core::instance::InstanceRef;
use crate::core::value::Value;
use crate::core::violation::{Violation, ViolationSet};
use crate::metadata::bean::TypeMetadata;
use crate::validation::interpolator::MessageInterpolator;
use std::collections::HashMap;
use std::sync::Arc;

/// Which elements of an instance a validation call looks at.
#[derive(Debug, Clone, PartialEq)]
pub enum Scope {
    /// Class-level and property constraints.
    Object,
    /// Constraints of a single property.
    Property(String),
    /// Return value constraints of a method, checked against `value`.
    ReturnValue {
        /// Method whose return value is checked.
        method: String,
        /// The returned value.
        value: Value,
    },
}

impl Scope {
    /// Check if constraints declared on `element` are in scope.
    pub fn admits(&self, element: &ConstrainedElement) -> bool {
        match (self, element) {
            (Scope::Object, ConstrainedElement::Type) => true,
            (Scope::Object, ConstrainedElement::Property(_)) => true,
            (Scope::Property(name), ConstrainedElement::Property(declared)) => name == declared,
            (Scope::ReturnValue { method, .. }, ConstrainedElement::ReturnValue(declared)) => {
                method == declared
            }
            _ => false,
        }
    }
}

/// Call-local state shared by every batch of one validation call.
pub struct EvaluationContext<'a> {
    metadata: &'a TypeMetadata,
    instance: InstanceRef<'a>,
    scope: Scope,
    /// Outcome per constraint index: true if it failed.
    outcomes: HashMap<usize, bool>,
}

impl<'a> EvaluationContext<'a> {
    /// Create a context for validating `instance` within `scope`.
    pub fn new(metadata: &'a TypeMetadata, instance: InstanceRef<'a>, scope: Scope) -> Self {
        Self {
            metadata,
            instance,
            scope,
            outcomes: HashMap::new(),
        }
    }

    /// The metadata of the validated type.
    pub fn metadata(&self) -> &'a TypeMetadata {
        self.metadata
    }

    /// The validated instance.
    pub fn instance(&self) -> InstanceRef<'a> {
        self.instance
    }

    /// The scope of this call.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Number of constraints evaluated so far.
    pub fn evaluated(&self) -> usize {
        self.outcomes.len()
    }

    fn value_of(&self, element: &ConstrainedElement) -> ValidatorResult<Value> {
        match element {
            ConstrainedElement::Type => Ok(self.instance.validatable().to_value()),
            ConstrainedElement::Property(name) => self
                .instance
                .validatable()
                .property(name)
                .ok_or_else(|| ValidatorError::UnknownProperty {
                    type_name: self.metadata.type_name(),
                    property: name.clone(),
                }),
            ConstrainedElement::ReturnValue(_) => match &self.scope {
                Scope::ReturnValue { value, .. } => Ok(value.clone()),
                _ => Ok(Value::None),
            },
        }
    }
}

/// Result of evaluating one batch.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Violations found by this batch
    pub violations: ViolationSet,
    /// Whether any constraint of the batch failed, including ones already
    /// reported by an earlier batch of the same call
    pub failed: bool,
}

/// Runs the constraints of a batch against an instance.
#[derive(Clone)]
pub struct ConstraintEvaluator {
    interpolator: Arc<dyn MessageInterpolator>,
}

impl ConstraintEvaluator {
    /// Create an evaluator using `interpolator` for messages.
    pub fn new(interpolator: Arc<dyn MessageInterpolator>) -> Self {
        Self { interpolator }
    }

    /// Evaluate every in-scope constraint belonging to a group of `batch`.
    ///
    /// Predicates of constraints outside the scope or the batch never run.
    /// A predicate error aborts the call with [`ValidatorError::ConstraintFault`].
    pub fn evaluate(
        &self,
        context: &mut EvaluationContext<'_>,
        batch: &GroupBatch,
    ) -> ValidatorResult<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        let metadata = context.metadata;

        for (index, descriptor) in metadata.constraints().iter().enumerate() {
            if !context.scope.admits(&descriptor.element) {
                continue;
            }
            if !batch.groups().iter().any(|g| descriptor.belongs_to(g)) {
                continue;
            }

            if let Some(&failed) = context.outcomes.get(&index) {
                outcome.failed |= failed;
                continue;
            }

            let value = context.value_of(&descriptor.element)?;
            let valid = self.check(descriptor, &value)?;
            context.outcomes.insert(index, !valid);

            if !valid {
                outcome.failed = true;
                outcome
                    .violations
                    .insert(self.violation(context, descriptor, batch, value));
            }
        }

        Ok(outcome)
    }

    fn check(&self, descriptor: &ConstraintDescriptor, value: &Value) -> ValidatorResult<bool> {
        let valid = descriptor
            .constraint
            .is_valid(value)
            .map_err(|source| ValidatorError::ConstraintFault {
                constraint: descriptor.constraint.name().to_string(),
                path: descriptor.element.path(),
                source,
            })?;

        log::trace!(
            "{} on '{}' -> {}",
            descriptor.constraint.name(),
            descriptor.element,
            if valid { "valid" } else { "violated" }
        );

        Ok(valid)
    }

    fn violation(
        &self,
        context: &EvaluationContext<'_>,
        descriptor: &ConstraintDescriptor,
        batch: &GroupBatch,
        value: Value,
    ) -> Violation {
        let message = self
            .interpolator
            .interpolate(&descriptor.message, &descriptor.constraint.attributes());

        Violation {
            path: descriptor.element.path(),
            group: batch.primary().clone(),
            constraint: descriptor.constraint.name().to_string(),
            message,
            message_template: descriptor.message.clone(),
            invalid_value: value,
            root_type: context.metadata.type_name().to_string(),
        }
    }
}

impl std::fmt::Debug for ConstraintEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstraintEvaluator").finish_non_exhaustive()
    }
}
