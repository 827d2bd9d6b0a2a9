//! Persistence seams consumed by the engine.
//!
//! [`VersionStore`] is the append-only home of version records;
//! [`EntityPersister`] is the host application's own insert/update/delete
//! for versioned entities. Both return their native error type, which the
//! engine passes through untouched.

use std::future::Future;

use crate::entity::{EntityRef, Versionable};
use crate::types::DbId;
use crate::version::{NewVersion, Version};

/// Append-only collection of versions, ordered by `id`.
pub trait VersionStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist `version`, assigning the next globally increasing `id`.
    fn append(&self, version: NewVersion)
        -> impl Future<Output = Result<Version, Self::Error>> + Send;

    /// The version with the highest `id` for `entity`.
    fn current_version(
        &self,
        entity: &EntityRef,
    ) -> impl Future<Output = Result<Option<Version>, Self::Error>> + Send;

    /// The version with the second-highest `id` for `entity`.
    fn previous_version(
        &self,
        entity: &EntityRef,
    ) -> impl Future<Output = Result<Option<Version>, Self::Error>> + Send;

    /// A version of `entity` by id. Versions of other entities are not found.
    fn by_id(
        &self,
        entity: &EntityRef,
        id: DbId,
    ) -> impl Future<Output = Result<Option<Version>, Self::Error>> + Send;

    /// Versions of `entity`, newest first.
    fn list(
        &self,
        entity: &EntityRef,
        limit: i64,
        offset: i64,
    ) -> impl Future<Output = Result<Vec<Version>, Self::Error>> + Send;

    fn count(&self, entity: &EntityRef) -> impl Future<Output = Result<i64, Self::Error>> + Send;

    /// Delete every version of `entity`, returning how many were removed.
    fn purge_all(&self, entity: &EntityRef)
        -> impl Future<Output = Result<u64, Self::Error>> + Send;
}

/// Host-side persistence of versionable entities.
pub trait EntityPersister: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Insert a new row. Must set the entity's key attribute.
    fn insert(
        &self,
        entity: &mut dyn Versionable,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Write the entity's dirty attributes to its existing row.
    fn update(&self, entity: &dyn Versionable)
        -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Permanently remove the entity's row.
    fn delete(&self, entity: &dyn Versionable)
        -> impl Future<Output = Result<(), Self::Error>> + Send;
}
