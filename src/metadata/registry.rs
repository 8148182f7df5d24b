//! Registry of type metadata.

use crate::core::group::Group;
use crate::core::instance::TypeKey;
use crate::metadata::bean::TypeMetadata;
use indexmap::IndexMap;
use std::sync::Arc;

/// Registry of constraint metadata, keyed by type token.
///
/// Registration is explicit: nothing is discovered at runtime. Types that
/// were never registered validate as unconstrained.
#[derive(Debug, Clone, Default)]
pub struct MetadataRegistry {
    types: IndexMap<TypeKey, Arc<TypeMetadata>>,
}

impl MetadataRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register metadata for a type. Replaces earlier metadata for the same type.
    pub fn register(&mut self, metadata: TypeMetadata) -> Option<Arc<TypeMetadata>> {
        let key = metadata.key();
        let previous = self.types.insert(key, Arc::new(metadata));
        if previous.is_some() {
            log::debug!("Replaced constraint metadata for {}", key);
        }
        previous
    }

    /// Get metadata for a type.
    pub fn get(&self, key: &TypeKey) -> Option<&Arc<TypeMetadata>> {
        self.types.get(key)
    }

    /// Get metadata for a type, or unconstrained metadata if none was registered.
    pub fn get_or_unconstrained(&self, key: TypeKey) -> Arc<TypeMetadata> {
        self.types
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Arc::new(TypeMetadata::unconstrained(key)))
    }

    /// Check if a type is registered.
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.types.contains_key(key)
    }

    /// Names of all registered types.
    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.types.keys().map(|k| k.name())
    }

    /// Own groups of all registered types.
    pub fn own_groups(&self) -> impl Iterator<Item = &Group> + '_ {
        self.types.values().map(|metadata| metadata.own_group())
    }

    /// Unregister a type.
    pub fn unregister(&mut self, key: &TypeKey) -> bool {
        self.types.shift_remove(key).is_some()
    }

    /// Get the total number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
