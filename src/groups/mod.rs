//! Group ordering: catalogs, default sequence providers and resolution.
//!
//! The resolver turns the groups a caller asks for into a [`ValidationOrder`]
//! before any constraint runs, invoking providers where a type redefines its
//! Default group.

pub mod catalog;
pub mod provider;
pub mod resolver;

pub use catalog::GroupCatalog;
pub use provider::{ErasedProvider, GroupSequenceProvider, ProviderInvoker, TypedProvider};
pub use resolver::{DefaultBinding, GroupSequenceResolver, OrderMember, ValidationOrder};
