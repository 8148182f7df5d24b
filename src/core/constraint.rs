//! Constraints and the elements they are declared on.
//!
//! A constraint pairs a predicate with the element it checks and the groups
//! it belongs to. Predicates answer `Ok(true)` (valid), `Ok(false)` (a
//! violation) or `Err` when the rule itself cannot be applied; the last case
//! is a fault in the rule, not a verdict about the value.

use crate::core::error::DefinitionError;
use crate::core::group::Group;
use crate::core::value::Value;
use indexmap::IndexMap;
use regex_lite::Regex;
use std::fmt;
use std::sync::Arc;

/// Predicate signature for custom constraints.
pub type Predicate = Arc<dyn Fn(&Value) -> anyhow::Result<bool> + Send + Sync>;

/// Element of a type a constraint is declared on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstrainedElement {
    /// The type as a whole (class-level constraint)
    Type,
    /// A named property
    Property(String),
    /// The return value of a named method
    ReturnValue(String),
}

impl ConstrainedElement {
    /// Path of this element as it appears in violations.
    pub fn path(&self) -> String {
        match self {
            ConstrainedElement::Type => String::new(),
            ConstrainedElement::Property(name) => name.clone(),
            ConstrainedElement::ReturnValue(method) => format!("{}.<return value>", method),
        }
    }
}

impl fmt::Display for ConstrainedElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstrainedElement::Type => write!(f, "<type>"),
            ConstrainedElement::Property(name) => write!(f, "{}", name),
            ConstrainedElement::ReturnValue(method) => write!(f, "{}()", method),
        }
    }
}

/// Built-in and custom constraint kinds.
#[derive(Clone)]
pub enum Constraint {
    /// Value must not be null
    NotNull,
    /// String, array or map must be non-null and non-empty
    NotEmpty,
    /// String length (in characters) must be within [min, max]
    Length {
        /// Smallest accepted length
        min: usize,
        /// Largest accepted length
        max: usize,
    },
    /// String must fully match a regular expression
    Pattern(Regex),
    /// Numeric value must be within [min, max]
    Range {
        /// Lower bound, inclusive
        min: f64,
        /// Upper bound, inclusive
        max: f64,
    },
    /// Boolean must be true
    AssertTrue,
    /// Boolean must be false
    AssertFalse,
    /// Custom predicate
    Custom {
        /// Name reported in violations
        name: String,
        /// The check itself
        predicate: Predicate,
    },
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::NotNull => write!(f, "NotNull"),
            Constraint::NotEmpty => write!(f, "NotEmpty"),
            Constraint::Length { min, max } => f
                .debug_struct("Length")
                .field("min", min)
                .field("max", max)
                .finish(),
            Constraint::Pattern(regex) => f.debug_tuple("Pattern").field(&regex.as_str()).finish(),
            Constraint::Range { min, max } => f
                .debug_struct("Range")
                .field("min", min)
                .field("max", max)
                .finish(),
            Constraint::AssertTrue => write!(f, "AssertTrue"),
            Constraint::AssertFalse => write!(f, "AssertFalse"),
            Constraint::Custom { name, .. } => f
                .debug_struct("Custom")
                .field("name", name)
                .field("predicate", &"<closure>")
                .finish(),
        }
    }
}

impl Constraint {
    /// Build a pattern constraint. The pattern must match the whole value.
    pub fn pattern(pattern: &str) -> Result<Self, DefinitionError> {
        let anchored = format!("^(?:{})$", pattern);
        Regex::new(&anchored)
            .map(Constraint::Pattern)
            .map_err(|e| DefinitionError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    /// Build a custom constraint from a predicate.
    pub fn custom<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        Constraint::Custom {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Short name of the constraint kind.
    pub fn name(&self) -> &str {
        match self {
            Constraint::NotNull => "NotNull",
            Constraint::NotEmpty => "NotEmpty",
            Constraint::Length { .. } => "Length",
            Constraint::Pattern(_) => "Pattern",
            Constraint::Range { .. } => "Range",
            Constraint::AssertTrue => "AssertTrue",
            Constraint::AssertFalse => "AssertFalse",
            Constraint::Custom { name, .. } => name,
        }
    }

    /// Check a value against this constraint.
    ///
    /// Null passes every constraint except the ones that exist to reject it.
    /// A value of a type the constraint cannot handle is an error.
    pub fn is_valid(&self, value: &Value) -> anyhow::Result<bool> {
        match self {
            Constraint::NotNull => Ok(!value.is_none()),

            Constraint::NotEmpty => match value {
                Value::None => Ok(false),
                other => other
                    .size()
                    .map(|len| len > 0)
                    .ok_or_else(|| unsupported(self, other)),
            },

            Constraint::Length { min, max } => match value {
                Value::None => Ok(true),
                other => other
                    .as_string()
                    .map(|s| {
                        let len = s.chars().count();
                        len >= *min && len <= *max
                    })
                    .ok_or_else(|| unsupported(self, other)),
            },

            Constraint::Pattern(regex) => match value {
                Value::None => Ok(true),
                other => other
                    .as_string()
                    .map(|s| regex.is_match(s))
                    .ok_or_else(|| unsupported(self, other)),
            },

            Constraint::Range { min, max } => match value {
                Value::None => Ok(true),
                other => match other.as_float() {
                    Some(num) => Ok(num >= *min && num <= *max),
                    None => Err(unsupported(self, other)),
                },
            },

            Constraint::AssertTrue | Constraint::AssertFalse => match value {
                Value::None => Ok(true),
                other => other
                    .as_bool()
                    .map(|b| b == matches!(self, Constraint::AssertTrue))
                    .ok_or_else(|| unsupported(self, other)),
            },

            Constraint::Custom { predicate, .. } => predicate(value),
        }
    }

    /// Attributes available to message templates, e.g. `{min}`.
    pub fn attributes(&self) -> IndexMap<String, Value> {
        let mut attributes = IndexMap::new();
        match self {
            Constraint::Length { min, max } => {
                attributes.insert("min".to_string(), Value::Integer(*min as i64));
                attributes.insert("max".to_string(), Value::Integer(*max as i64));
            }
            Constraint::Range { min, max } => {
                attributes.insert("min".to_string(), Value::Float(*min));
                attributes.insert("max".to_string(), Value::Float(*max));
            }
            Constraint::Pattern(regex) => {
                // Strip the anchors added by `Constraint::pattern`.
                let source = regex.as_str();
                let inner = source
                    .strip_prefix("^(?:")
                    .and_then(|s| s.strip_suffix(")$"))
                    .unwrap_or(source);
                attributes.insert("regexp".to_string(), Value::String(inner.to_string()));
            }
            _ => {}
        }
        attributes
    }

    /// Message template used when none is given explicitly.
    pub fn default_message(&self) -> &'static str {
        match self {
            Constraint::NotNull => "may not be null",
            Constraint::NotEmpty => "may not be empty",
            Constraint::Length { .. } => "length must be between {min} and {max}",
            Constraint::Pattern(_) => "must match \"{regexp}\"",
            Constraint::Range { .. } => "must be between {min} and {max}",
            Constraint::AssertTrue => "must be true",
            Constraint::AssertFalse => "must be false",
            Constraint::Custom { .. } => "is invalid",
        }
    }
}

fn unsupported(constraint: &Constraint, value: &Value) -> anyhow::Error {
    anyhow::anyhow!(
        "{} cannot be applied to a value of type {}",
        constraint.name(),
        value.kind()
    )
}

/// A constraint as declared on a type: what it checks, where, in which groups,
/// and with which message.
#[derive(Debug, Clone)]
pub struct ConstraintDescriptor {
    /// The constraint to run
    pub constraint: Constraint,
    /// The element it is declared on
    pub element: ConstrainedElement,
    /// Groups it belongs to (never empty)
    pub groups: Vec<Group>,
    /// Message template
    pub message: String,
}

impl ConstraintDescriptor {
    /// Declare a constraint on an element, in the Default group, with the
    /// constraint's default message.
    pub fn new(element: ConstrainedElement, constraint: Constraint) -> Self {
        let message = constraint.default_message().to_string();
        Self {
            constraint,
            element,
            groups: vec![Group::DEFAULT],
            message,
        }
    }

    /// Replace the groups. An empty list keeps the Default group.
    pub fn in_groups(mut self, groups: impl IntoIterator<Item = Group>) -> Self {
        let mut groups: Vec<Group> = groups.into_iter().collect();
        groups.dedup();
        if !groups.is_empty() {
            self.groups = groups;
        }
        self
    }

    /// Set the message template.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Check if this constraint belongs to `group`.
    pub fn belongs_to(&self, group: &Group) -> bool {
        self.groups.contains(group)
    }
}
