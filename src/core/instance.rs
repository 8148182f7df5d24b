//! The capability a type needs in order to be validated.

use crate::core::value::Value;
use std::any::{Any, TypeId};
use std::fmt;

/// A type whose instances can be validated.
///
/// Implementations hand out property values by name. There is no reflection:
/// what a type exposes here is exactly what its constraints can see.
pub trait Validatable: Any + Send + Sync {
    /// Value of a property.
    ///
    /// Returns `None` if the type has no such property and `Some(Value::None)`
    /// if the property exists but is null.
    fn property(&self, name: &str) -> Option<Value>;

    /// Snapshot of the whole instance, seen by class-level constraints.
    fn to_value(&self) -> Value {
        Value::None
    }
}

/// Type token used to key metadata, providers and cached bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Token for the type `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying type id.
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Full type path.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A borrowed instance under validation, viewed both as a [`Validatable`]
/// and as [`Any`] so type-erased providers can downcast it.
#[derive(Clone, Copy)]
pub struct InstanceRef<'a> {
    key: TypeKey,
    validatable: &'a dyn Validatable,
    any: &'a dyn Any,
}

impl<'a> InstanceRef<'a> {
    /// Borrow a concrete instance.
    pub fn new<T: Validatable>(instance: &'a T) -> Self {
        Self {
            key: TypeKey::of::<T>(),
            validatable: instance,
            any: instance,
        }
    }

    /// Type token of the instance.
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// The instance as a validatable object.
    pub fn validatable(&self) -> &'a dyn Validatable {
        self.validatable
    }

    /// The instance as `Any`.
    pub fn as_any(&self) -> &'a dyn Any {
        self.any
    }
}

impl fmt::Debug for InstanceRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceRef").field("type", &self.key.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Point {
        x: i64,
    }

    impl Validatable for Point {
        fn property(&self, name: &str) -> Option<Value> {
            match name {
                "x" => Some(Value::Integer(self.x)),
                _ => None,
            }
        }
    }

    #[test]
    fn test_type_key_identity() {
        assert_eq!(TypeKey::of::<Point>(), TypeKey::of::<Point>());
        assert_ne!(TypeKey::of::<Point>(), TypeKey::of::<String>());
        assert!(TypeKey::of::<Point>().name().ends_with("Point"));
    }

    #[test]
    fn test_instance_ref_downcast() {
        let point = Point { x: 4 };
        let instance = InstanceRef::new(&point);

        assert_eq!(instance.key(), TypeKey::of::<Point>());
        assert!(instance.as_any().downcast_ref::<Point>().is_some());
        assert_eq!(instance.validatable().property("x"), Some(Value::Integer(4)));
        assert_eq!(instance.validatable().property("y"), None);
        assert!(instance.validatable().to_value().is_none());
    }
}
