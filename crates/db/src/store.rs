//! [`VersionStore`] backed by the `versions` table.

use versionable_core::types::DbId;
use versionable_core::{EntityRef, NewVersion, Version, VersionStore};

use crate::repositories::VersionRepo;
use crate::DbPool;

/// Postgres version store. Cloning shares the underlying pool.
#[derive(Debug, Clone)]
pub struct PgVersionStore {
    pool: DbPool,
}

impl PgVersionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl VersionStore for PgVersionStore {
    type Error = sqlx::Error;

    async fn append(&self, version: NewVersion) -> Result<Version, Self::Error> {
        VersionRepo::create(&self.pool, &version).await
    }

    async fn current_version(&self, entity: &EntityRef) -> Result<Option<Version>, Self::Error> {
        VersionRepo::find_current(&self.pool, entity).await
    }

    async fn previous_version(&self, entity: &EntityRef) -> Result<Option<Version>, Self::Error> {
        VersionRepo::find_previous(&self.pool, entity).await
    }

    async fn by_id(&self, entity: &EntityRef, id: DbId) -> Result<Option<Version>, Self::Error> {
        VersionRepo::find_by_id(&self.pool, entity, id).await
    }

    async fn list(
        &self,
        entity: &EntityRef,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Version>, Self::Error> {
        VersionRepo::list_for_entity(&self.pool, entity, limit, offset).await
    }

    async fn count(&self, entity: &EntityRef) -> Result<i64, Self::Error> {
        VersionRepo::count_for_entity(&self.pool, entity).await
    }

    async fn purge_all(&self, entity: &EntityRef) -> Result<u64, Self::Error> {
        VersionRepo::delete_for_entity(&self.pool, entity).await
    }
}
