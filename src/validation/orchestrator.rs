//! Validation orchestrator.
//!
//! Walks a resolved [`ValidationOrder`] and aggregates the violations of its
//! members.

use crate::core::error::ValidatorResult;
use crate::core::violation::ViolationSet;
use crate::groups::resolver::{OrderMember, ValidationOrder};
use crate::validation::evaluator::{ConstraintEvaluator, EvaluationContext};
use std::time::Instant;

/// Runs the members of a validation order.
///
/// Sequence members stop at their first failing batch and contribute only
/// that batch's violations. Independent members are all evaluated and their
/// violations unioned.
#[derive(Debug, Clone)]
pub struct ValidationOrchestrator {
    evaluator: ConstraintEvaluator,
    fail_fast: bool,
}

impl ValidationOrchestrator {
    /// Create an orchestrator.
    pub fn new(evaluator: ConstraintEvaluator) -> Self {
        Self {
            evaluator,
            fail_fast: false,
        }
    }

    /// Stop the whole run after the first batch that reports a violation.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Check if fail-fast is enabled.
    pub fn fail_fast(&self) -> bool {
        self.fail_fast
    }

    /// Evaluate `order` for the instance held by `context`.
    pub fn run(
        &self,
        context: &mut EvaluationContext<'_>,
        order: &ValidationOrder,
    ) -> ValidatorResult<ViolationSet> {
        let start = Instant::now();
        let mut violations = ViolationSet::new();

        for member in order.members() {
            match member {
                OrderMember::Group(batch) => {
                    let outcome = self.evaluator.evaluate(context, batch)?;
                    violations.extend(outcome.violations);
                }
                OrderMember::Sequence(batches) => {
                    for batch in batches {
                        let outcome = self.evaluator.evaluate(context, batch)?;
                        violations.extend(outcome.violations);

                        if outcome.failed {
                            log::debug!(
                                "Sequence of {} stopped at {}",
                                context.metadata().type_name(),
                                batch
                            );
                            break;
                        }
                    }
                }
            }

            if self.fail_fast && !violations.is_empty() {
                log::debug!("Fail-fast: skipping the rest of {}", order);
                break;
            }
        }

        log::debug!(
            "Validated {} in {:?}: {} violation(s), {} constraint(s) evaluated",
            context.metadata().type_name(),
            start.elapsed(),
            violations.len(),
            context.evaluated()
        );

        Ok(violations)
    }
}
