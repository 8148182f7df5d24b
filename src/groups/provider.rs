//! Default group sequence providers.
//!
//! A provider computes, per instance, the sequence that replaces the Default
//! group of its type. Providers are registered on the type's metadata,
//! constructed once and shared between threads, so they must not mutate
//! anything they can see.

use crate::core::error::{DefinitionError, DefinitionResult};
use crate::core::group::{Group, GroupSequence};
use crate::core::instance::InstanceRef;
use std::any::Any;
use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Computes the default group sequence of an instance of `T`.
pub trait GroupSequenceProvider<T>: Send + Sync {
    /// Groups to evaluate, in order, in place of Default.
    ///
    /// The result must be non-empty and contain `Group::of::<T>()`, which
    /// stands for the Default constraints of `T`. Returning an empty list is a
    /// definition error, not a way to opt out.
    fn validation_groups(&self, instance: &T) -> anyhow::Result<Vec<Group>>;
}

impl<T, F> GroupSequenceProvider<T> for F
where
    F: Fn(&T) -> anyhow::Result<Vec<Group>> + Send + Sync,
{
    fn validation_groups(&self, instance: &T) -> anyhow::Result<Vec<Group>> {
        self(instance)
    }
}

/// Provider with its instance type erased, as stored in type metadata.
pub trait ErasedProvider: Send + Sync {
    /// Name of the provider type, for diagnostics.
    fn provider_name(&self) -> &'static str;

    /// Call the provider. Returns `None` if `instance` is not of the
    /// provider's type.
    fn provide(&self, instance: &dyn Any) -> Option<anyhow::Result<Vec<Group>>>;
}

/// Adapter erasing the type parameter of a [`GroupSequenceProvider`].
pub struct TypedProvider<T, P> {
    provider: P,
    _marker: PhantomData<fn(&T)>,
}

impl<T, P> TypedProvider<T, P>
where
    T: 'static,
    P: GroupSequenceProvider<T> + 'static,
{
    /// Wrap a provider.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            _marker: PhantomData,
        }
    }
}

impl<T, P> ErasedProvider for TypedProvider<T, P>
where
    T: 'static,
    P: GroupSequenceProvider<T> + 'static,
{
    fn provider_name(&self) -> &'static str {
        std::any::type_name::<P>()
    }

    fn provide(&self, instance: &dyn Any) -> Option<anyhow::Result<Vec<Group>>> {
        instance
            .downcast_ref::<T>()
            .map(|typed| self.provider.validation_groups(typed))
    }
}

/// Calls providers inside a fault boundary.
///
/// Errors and panics raised by a provider become [`DefinitionError`]s. The
/// invoker takes no locks: providers are required to be read-only.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProviderInvoker;

impl ProviderInvoker {
    /// Invoke `provider` for `instance` and check that it returned something.
    pub fn invoke(
        &self,
        provider: &dyn ErasedProvider,
        instance: InstanceRef<'_>,
    ) -> DefinitionResult<GroupSequence> {
        let type_name = instance.key().name();
        let provider_name = provider.provider_name();

        log::trace!("Invoking group sequence provider {} for {}", provider_name, type_name);

        let outcome = catch_unwind(AssertUnwindSafe(|| provider.provide(instance.as_any())));

        let groups = match outcome {
            Ok(Some(Ok(groups))) => groups,
            Ok(Some(Err(source))) => {
                return Err(DefinitionError::ProviderFault {
                    type_name,
                    provider: provider_name,
                    source,
                })
            }
            Ok(None) => {
                return Err(DefinitionError::ProviderTypeMismatch {
                    type_name,
                    provider: provider_name,
                })
            }
            Err(payload) => {
                return Err(DefinitionError::ProviderPanicked {
                    type_name,
                    provider: provider_name,
                    message: panic_message(payload.as_ref()),
                })
            }
        };

        GroupSequence::new(groups).map_err(|_| DefinitionError::EmptyProviderSequence {
            type_name,
            provider: provider_name,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::instance::Validatable;
    use crate::core::value::Value;

    struct Ticket {
        priority: i64,
    }

    impl Validatable for Ticket {
        fn property(&self, name: &str) -> Option<Value> {
            match name {
                "priority" => Some(Value::Integer(self.priority)),
                _ => None,
            }
        }
    }

    struct Other;

    impl Validatable for Other {
        fn property(&self, _name: &str) -> Option<Value> {
            None
        }
    }

    struct PriorityProvider;

    impl GroupSequenceProvider<Ticket> for PriorityProvider {
        fn validation_groups(&self, ticket: &Ticket) -> anyhow::Result<Vec<Group>> {
            if ticket.priority > 5 {
                Ok(vec![Group::of::<Ticket>(), Group::named("Urgent")])
            } else {
                Ok(vec![Group::of::<Ticket>()])
            }
        }
    }

    fn erased<P: GroupSequenceProvider<Ticket> + 'static>(provider: P) -> Box<dyn ErasedProvider> {
        Box::new(TypedProvider::<Ticket, P>::new(provider))
    }

    #[test]
    fn test_output_depends_on_instance() {
        let provider = erased(PriorityProvider);
        let invoker = ProviderInvoker;

        let low = Ticket { priority: 1 };
        let high = Ticket { priority: 9 };

        let low_seq = invoker.invoke(provider.as_ref(), InstanceRef::new(&low)).unwrap();
        let high_seq = invoker.invoke(provider.as_ref(), InstanceRef::new(&high)).unwrap();

        assert_eq!(low_seq.len(), 1);
        assert_eq!(high_seq.len(), 2);
        assert!(high_seq.contains(&Group::named("Urgent")));
    }

    #[test]
    fn test_empty_output_is_definition_error() {
        let provider = erased(|_: &Ticket| -> anyhow::Result<Vec<Group>> { Ok(Vec::new()) });
        let ticket = Ticket { priority: 1 };

        let result = ProviderInvoker.invoke(provider.as_ref(), InstanceRef::new(&ticket));
        assert!(matches!(
            result,
            Err(DefinitionError::EmptyProviderSequence { .. })
        ));
    }

    #[test]
    fn test_provider_error_is_wrapped() {
        let provider = erased(|_: &Ticket| -> anyhow::Result<Vec<Group>> {
            Err(anyhow::anyhow!("routing table unavailable"))
        });
        let ticket = Ticket { priority: 1 };

        let err = ProviderInvoker
            .invoke(provider.as_ref(), InstanceRef::new(&ticket))
            .unwrap_err();
        assert!(err.is_provider_fault());
        assert!(err.to_string().contains("routing table unavailable"));
    }

    #[test]
    fn test_provider_panic_is_caught() {
        let provider = erased(|_: &Ticket| -> anyhow::Result<Vec<Group>> {
            panic!("provider bug")
        });
        let ticket = Ticket { priority: 1 };

        let err = ProviderInvoker
            .invoke(provider.as_ref(), InstanceRef::new(&ticket))
            .unwrap_err();
        match err {
            DefinitionError::ProviderPanicked { message, .. } => assert_eq!(message, "provider bug"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_wrong_instance_type() {
        let provider = erased(PriorityProvider);
        let other = Other;

        let result = ProviderInvoker.invoke(provider.as_ref(), InstanceRef::new(&other));
        assert!(matches!(
            result,
            Err(DefinitionError::ProviderTypeMismatch { .. })
        ));
    }
}
