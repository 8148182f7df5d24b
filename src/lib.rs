//! # Sequent - Group-ordered constraint validation
//!
//! Sequent validates Rust values against declared constraints, organized in
//! groups. Groups can be evaluated independently or in sequences that stop at
//! the first failing group, and a type can redefine what its Default group
//! means, either with a fixed sequence or per instance with a provider.
//!
//! ## Features
//!
//! - **Groups and sequences**: Partition constraints and evaluate them in order
//! - **Default group redefinition**: Static sequences or per-instance providers
//! - **Group inheritance**: Validating a group also validates its ancestors
//! - **Three entry points**: Whole objects, single properties, method return values
//! - **Thread-safe**: A built `Validator` is `Send + Sync` and meant to be shared
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sequent::prelude::*;
//!
//! struct User {
//!     password: Option<String>,
//!     admin: bool,
//! }
//!
//! impl Validatable for User {
//!     fn property(&self, name: &str) -> Option<Value> {
//!         match name {
//!             "password" => Some(self.password.clone().into()),
//!             "admin" => Some(Value::Boolean(self.admin)),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! let strong = Group::named("StrongCheck");
//!
//! let metadata = TypeMetadata::builder::<User>()
//!     .property("password", Constraint::pattern(r"\w+")?)
//!     .property_in("password", Constraint::Length { min: 10, max: 20 }, [strong.clone()])
//!     .group_sequence_provider(move |user: &User| -> anyhow::Result<Vec<Group>> {
//!         if user.admin {
//!             Ok(vec![Group::of::<User>(), strong.clone()])
//!         } else {
//!             Ok(vec![Group::of::<User>()])
//!         }
//!     })
//!     .build();
//!
//! let validator = Validator::builder().register(metadata).build()?;
//!
//! let admin = User { password: Some("short".into()), admin: true };
//! let violations = validator.validate_object(&admin, &[])?;
//! assert_eq!(violations.messages(), vec!["length must be between 10 and 20"]);
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: Groups, values, constraints, violations and errors
//! - [`metadata`]: Per-type constraint metadata and its registry
//! - [`groups`]: Group catalog, sequence providers and order resolution
//! - [`validation`]: Constraint evaluation and orchestration
//! - [`validator`]: The entry points
//! - [`config`]: Validator options

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod groups;
pub mod metadata;
pub mod validation;
pub mod validator;

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```rust,ignore
/// use sequent::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::core::constraint::{ConstrainedElement, Constraint, ConstraintDescriptor};
    pub use crate::core::group::{Group, GroupBatch, GroupSequence};
    pub use crate::core::instance::{InstanceRef, TypeKey, Validatable};
    pub use crate::core::value::Value;
    pub use crate::core::violation::{Violation, ViolationSet};

    // Errors
    pub use crate::core::error::{
        ConfigError, DefinitionError, DefinitionResult, ValidatorError, ValidatorResult,
    };

    // Metadata
    pub use crate::metadata::bean::{TypeMetadata, TypeMetadataBuilder};
    pub use crate::metadata::registry::MetadataRegistry;

    // Groups
    pub use crate::groups::catalog::GroupCatalog;
    pub use crate::groups::provider::GroupSequenceProvider;
    pub use crate::groups::resolver::{OrderMember, ValidationOrder};

    // Validation
    pub use crate::validation::interpolator::{AttributeInterpolator, MessageInterpolator};

    // Entry points
    pub use crate::config::ValidatorOptions;
    pub use crate::validator::{Validator, ValidatorBuilder};
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::prelude::*;

    struct Badge {
        holder: Option<String>,
    }

    impl Validatable for Badge {
        fn property(&self, name: &str) -> Option<Value> {
            match name {
                "holder" => Some(self.holder.clone().into()),
                _ => None,
            }
        }
    }

    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
        assert_eq!(super::NAME, "sequent");
    }

    #[test]
    fn test_prelude_round_trip() {
        let validator = Validator::builder()
            .register(
                TypeMetadata::builder::<Badge>()
                    .property("holder", Constraint::NotEmpty)
                    .build(),
            )
            .build()
            .unwrap();

        let violations = validator
            .validate_object(&Badge { holder: Some(String::new()) }, &[])
            .unwrap();
        assert_eq!(violations.messages(), vec!["may not be empty"]);
    }

    #[test]
    fn test_resolve_plain_default() {
        let validator = Validator::builder().build().unwrap();
        let order = validator
            .resolve(&Badge { holder: None }, &[Group::DEFAULT])
            .unwrap();
        assert_eq!(order.batch_groups(), vec![vec![Group::DEFAULT]]);
    }
}
