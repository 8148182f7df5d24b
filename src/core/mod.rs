//! Core types for the sequent validation engine.
//!
//! This module contains the data the engine works on:
//! - Groups, group sequences and batches
//! - Values and the `Validatable` instance capability
//! - Constraints and where they are declared
//! - Violations
//! - Error types

pub mod constraint;
pub mod error;
pub mod group;
pub mod instance;
pub mod value;
pub mod violation;

// Re-export commonly used types
pub use constraint::{ConstrainedElement, Constraint, ConstraintDescriptor};
pub use error::{ConfigError, DefinitionError, ValidatorError};
pub use group::{Group, GroupBatch, GroupSequence};
pub use instance::{InstanceRef, TypeKey, Validatable};
pub use value::Value;
pub use violation::{Violation, ViolationSet};
