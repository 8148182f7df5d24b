//! Validation of instances against a resolved group order.
//!
//! The orchestrator walks the order produced by the resolver, the evaluator
//! runs the constraints of each batch, and the interpolator renders messages.

pub mod evaluator;
pub mod interpolator;
pub mod orchestrator;

pub use evaluator::{BatchOutcome, ConstraintEvaluator, EvaluationContext, Scope};
pub use interpolator::{AttributeInterpolator, MessageInterpolator, VerbatimInterpolator};
pub use orchestrator::ValidationOrchestrator;
