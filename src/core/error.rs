//! Error types for sequent.
//!
//! Uses thiserror for structured errors with context. Failed constraints are
//! not errors: they are reported as [`Violation`](crate::core::violation::Violation)
//! data. Errors here mean the configuration is broken or a rule implementation
//! itself failed.

use crate::core::group::Group;
use thiserror::Error;

/// Top-level error type for validation calls.
#[derive(Error, Debug)]
pub enum ValidatorError {
    /// A group sequence, provider or group definition is broken.
    #[error("Group definition error: {0}")]
    Definition(#[from] DefinitionError),

    /// A constraint predicate could not decide on a value.
    #[error("Constraint '{constraint}' on '{path}' failed to evaluate: {source}")]
    ConstraintFault {
        /// Name of the constraint.
        constraint: String,
        /// Path of the constrained element.
        path: String,
        /// What went wrong inside the predicate.
        #[source]
        source: anyhow::Error,
    },

    /// A single property was requested that the instance does not expose.
    #[error("Type {type_name} has no property '{property}'")]
    UnknownProperty {
        /// Type that was validated.
        type_name: &'static str,
        /// Requested property name.
        property: String,
    },
}

/// Structural defects in group sequences, providers, or group definitions.
///
/// Raised during resolution, before any constraint predicate runs. These are
/// programming errors; retrying will not help.
#[derive(Error, Debug)]
pub enum DefinitionError {
    /// A sequence was declared without any group.
    #[error("A group sequence must contain at least one group")]
    EmptySequence,

    /// A type has both a static default sequence and a provider.
    #[error("Type {type_name} declares both a static default group sequence and a group sequence provider")]
    ConflictingDefaultSequence {
        /// Type whose definition is broken.
        type_name: &'static str,
    },

    /// A provider returned no groups.
    #[error("Group sequence provider {provider} returned an empty sequence for {type_name}")]
    EmptyProviderSequence {
        /// Type whose definition is broken.
        type_name: &'static str,
        /// Type name of the provider.
        provider: &'static str,
    },

    /// A redefined default sequence omits the type's own group.
    #[error("The default group sequence of {type_name} must contain the type's own group {group}")]
    MissingOwnGroup {
        /// Type whose definition is broken.
        type_name: &'static str,
        /// The group that should have been present.
        group: Group,
    },

    /// A redefined default sequence contains Default itself.
    #[error("The Default group cannot be part of the redefined default group sequence of {type_name}")]
    DefaultInRedefinedSequence {
        /// Type whose definition is broken.
        type_name: &'static str,
    },

    /// Groups reach themselves through inheritance or sequence membership.
    #[error("Cyclic group definition involving: {groups:?}")]
    CyclicGroupDefinition {
        /// Groups on the cycle, sorted by name.
        groups: Vec<Group>,
    },

    /// The same name was defined as a sequence twice.
    #[error("Group {0} is already defined as a sequence")]
    DuplicateSequence(Group),

    /// A named sequence uses the Default group or a type's own group as its name.
    #[error("Group {0} is reserved and cannot name a group sequence")]
    ReservedSequenceName(Group),

    /// A provider returned an error.
    #[error("Group sequence provider {provider} failed for {type_name}: {source}")]
    ProviderFault {
        /// Type whose definition is broken.
        type_name: &'static str,
        /// Type name of the provider.
        provider: &'static str,
        /// The provider's error.
        #[source]
        source: anyhow::Error,
    },

    /// A provider panicked.
    #[error("Group sequence provider {provider} panicked for {type_name}: {message}")]
    ProviderPanicked {
        /// Type whose definition is broken.
        type_name: &'static str,
        /// Type name of the provider.
        provider: &'static str,
        /// Panic payload, when it was a string.
        message: String,
    },

    /// A provider was handed an instance of a type it does not handle.
    #[error("Group sequence provider {provider} cannot inspect an instance of {type_name}")]
    ProviderTypeMismatch {
        /// Type of the instance.
        type_name: &'static str,
        /// Type name of the provider.
        provider: &'static str,
    },

    /// A pattern constraint failed to compile.
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The pattern source.
        pattern: String,
        /// Compiler message.
        reason: String,
    },
}

/// Errors from loading validator configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for the options.
    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

// ============================================================================
// Error Utilities
// ============================================================================

impl ValidatorError {
    /// Check if this error comes from a broken group or provider definition.
    pub fn is_definition_error(&self) -> bool {
        matches!(self, ValidatorError::Definition(_))
    }

    /// Get the definition error, if this is one.
    pub fn as_definition_error(&self) -> Option<&DefinitionError> {
        match self {
            ValidatorError::Definition(err) => Some(err),
            _ => None,
        }
    }
}

impl DefinitionError {
    /// Name of the type whose definition is broken, if known.
    pub fn type_name(&self) -> Option<&'static str> {
        match self {
            DefinitionError::ConflictingDefaultSequence { type_name }
            | DefinitionError::EmptyProviderSequence { type_name, .. }
            | DefinitionError::MissingOwnGroup { type_name, .. }
            | DefinitionError::DefaultInRedefinedSequence { type_name }
            | DefinitionError::ProviderFault { type_name, .. }
            | DefinitionError::ProviderPanicked { type_name, .. }
            | DefinitionError::ProviderTypeMismatch { type_name, .. } => Some(type_name),
            _ => None,
        }
    }

    /// Check if the error was raised by the provider's own logic.
    pub fn is_provider_fault(&self) -> bool {
        matches!(
            self,
            DefinitionError::ProviderFault { .. } | DefinitionError::ProviderPanicked { .. }
        )
    }
}

/// Result type alias for validation calls.
pub type ValidatorResult<T> = Result<T, ValidatorError>;

/// Result type alias for group and provider definitions.
pub type DefinitionResult<T> = Result<T, DefinitionError>;
