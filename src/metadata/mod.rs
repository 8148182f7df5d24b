//! Constraint metadata: what is declared on each validated type.

pub mod bean;
pub mod registry;

pub use bean::{TypeMetadata, TypeMetadataBuilder};
pub use registry::MetadataRegistry;
