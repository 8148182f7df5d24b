//! Values inspected by constraints.
//!
//! Validated instances expose their properties and method results as
//! [`Value`]s. The enum is closed on purpose: constraints pattern-match on it
//! and serde handles it natively for violation reports.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A value read from a validated instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Value {
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point number
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Boolean value
    Boolean(bool),
    /// Ordered list of values
    Array(Vec<Value>),
    /// Key-value map
    Map(HashMap<String, Value>),
    /// Absent value (null)
    None,
}

impl Value {
    /// Numeric view; integers widen to floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Borrow the string payload.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The boolean payload.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Number of elements: characters of a string, items of an array or
    /// entries of a map. `None` for scalars and null.
    pub fn size(&self) -> Option<usize> {
        match self {
            Value::String(s) => Some(s.chars().count()),
            Value::Array(items) => Some(items.len()),
            Value::Map(entries) => Some(entries.len()),
            _ => None,
        }
    }

    /// Check if this value is None (null).
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Name of the variant, used in fault messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::None => "none",
        }
    }
}

// Floats compare by bit pattern so that Eq and Hash stay consistent and
// violations holding floats can live in a set.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::None, Value::None) => true,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, hasher: &mut H) {
        std::mem::discriminant(self).hash(hasher);

        match self {
            Value::Integer(i) => i.hash(hasher),
            Value::Float(f) => f.to_bits().hash(hasher),
            Value::String(s) => s.hash(hasher),
            Value::Boolean(b) => b.hash(hasher),
            Value::Array(arr) => {
                arr.len().hash(hasher);
                for v in arr {
                    v.hash(hasher);
                }
            }
            Value::Map(map) => {
                map.len().hash(hasher);
                // Sort keys for deterministic hashing
                let mut sorted_keys: Vec<_> = map.keys().collect();
                sorted_keys.sort();
                for k in sorted_keys {
                    k.hash(hasher);
                    if let Some(v) = map.get(k) {
                        v.hash(hasher);
                    }
                }
            }
            Value::None => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Array(arr) => write!(f, "Array[{}]", arr.len()),
            Value::Map(map) => write!(f, "Map{{{} entries}}", map.len()),
            Value::None => write!(f, "null"),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::None)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}
