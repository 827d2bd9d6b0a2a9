//! Type registry: maps stored type tags back to constructible entity types.

use std::collections::HashMap;

use crate::entity::Versionable;
use crate::error::VersioningError;

/// Builds an empty instance of a registered entity type.
pub type EntityFactory = fn() -> Box<dyn Versionable>;

/// Lookup table from `versions.entity_type` to a concrete entity type.
#[derive(Default, Clone)]
pub struct TypeRegistry {
    factories: HashMap<String, EntityFactory>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `E` under the tag its instances report.
    pub fn register<E>(&mut self) -> &mut Self
    where
        E: Versionable + Default,
    {
        let tag = E::default().type_tag();
        self.factories.insert(tag.to_string(), build::<E>);
        self
    }

    /// Register an extra tag (e.g. a renamed type) for an existing factory.
    pub fn alias(&mut self, tag: impl Into<String>, factory: EntityFactory) -> &mut Self {
        self.factories.insert(tag.into(), factory);
        self
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    /// Build an empty instance for `tag`.
    pub fn resolve(&self, tag: &str) -> Result<Box<dyn Versionable>, VersioningError> {
        self.factories
            .get(tag)
            .map(|factory| factory())
            .ok_or_else(|| VersioningError::UnknownVersionedType(tag.to_string()))
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<&String> = self.factories.keys().collect();
        tags.sort();
        f.debug_struct("TypeRegistry").field("tags", &tags).finish()
    }
}

fn build<E>() -> Box<dyn Versionable>
where
    E: Versionable + Default,
{
    Box::new(E::default())
}
