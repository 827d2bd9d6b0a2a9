//! In-memory [`VersionStore`] and [`EntityPersister`].
//!
//! Single-process stores guarded by a mutex. Used for embedding the engine
//! without a database and as the backing store in tests. Each store can be
//! told to fail its next write to exercise error paths.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use crate::entity::{EntityRef, Versionable};
use crate::store::{EntityPersister, VersionStore};
use crate::types::{Attributes, DbId};
use crate::version::{NewVersion, Version};

#[derive(Debug, thiserror::Error)]
pub enum MemoryStoreError {
    #[error("Store lock poisoned")]
    Poisoned,

    #[error("Injected write failure")]
    InjectedFailure,

    #[error("Row not found: {0}")]
    NotFound(EntityRef),

    #[error("Entity {0} has no primary key")]
    MissingKey(&'static str),
}

// ---------------------------------------------------------------------------
// MemoryVersionStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct VersionTable {
    next_id: DbId,
    rows: Vec<Version>,
    fail_next_append: bool,
}

/// Version table held in memory. Ids are allocated from one counter shared
/// by all entities.
#[derive(Debug, Default)]
pub struct MemoryVersionStore {
    inner: Mutex<VersionTable>,
}

impl MemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `append` fail with [`MemoryStoreError::InjectedFailure`].
    pub fn fail_next_append(&self) -> Result<(), MemoryStoreError> {
        self.lock()?.fail_next_append = true;
        Ok(())
    }

    /// Total number of versions across all entities.
    pub fn len(&self) -> Result<usize, MemoryStoreError> {
        Ok(self.lock()?.rows.len())
    }

    pub fn is_empty(&self) -> Result<bool, MemoryStoreError> {
        Ok(self.lock()?.rows.is_empty())
    }

    fn lock(&self) -> Result<MutexGuard<'_, VersionTable>, MemoryStoreError> {
        self.inner.lock().map_err(|_| MemoryStoreError::Poisoned)
    }

    /// Versions of `entity`, newest first.
    fn newest_first(&self, entity: &EntityRef) -> Result<Vec<Version>, MemoryStoreError> {
        let table = self.lock()?;
        let mut versions: Vec<Version> = table
            .rows
            .iter()
            .filter(|v| v.entity_type == entity.entity_type && v.entity_id == entity.entity_id)
            .cloned()
            .collect();
        versions.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(versions)
    }
}

impl VersionStore for MemoryVersionStore {
    type Error = MemoryStoreError;

    async fn append(&self, version: NewVersion) -> Result<Version, Self::Error> {
        let mut table = self.lock()?;
        if table.fail_next_append {
            table.fail_next_append = false;
            return Err(MemoryStoreError::InjectedFailure);
        }

        table.next_id += 1;
        let now = Utc::now();
        let row = Version {
            id: table.next_id,
            entity_type: version.entity.entity_type,
            entity_id: version.entity.entity_id,
            action: version.action,
            user_id: version.user_id,
            reason: version.reason,
            url: version.url,
            ip_address: version.ip_address,
            user_agent: version.user_agent,
            model_data: version.model_data,
            additional_data: version.additional_data,
            created_at: now,
            updated_at: now,
        };
        table.rows.push(row.clone());
        Ok(row)
    }

    async fn current_version(&self, entity: &EntityRef) -> Result<Option<Version>, Self::Error> {
        Ok(self.newest_first(entity)?.into_iter().next())
    }

    async fn previous_version(&self, entity: &EntityRef) -> Result<Option<Version>, Self::Error> {
        Ok(self.newest_first(entity)?.into_iter().nth(1))
    }

    async fn by_id(&self, entity: &EntityRef, id: DbId) -> Result<Option<Version>, Self::Error> {
        Ok(self.newest_first(entity)?.into_iter().find(|v| v.id == id))
    }

    async fn list(
        &self,
        entity: &EntityRef,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Version>, Self::Error> {
        let limit = usize::try_from(limit).unwrap_or(0);
        let offset = usize::try_from(offset).unwrap_or(0);
        Ok(self
            .newest_first(entity)?
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    async fn count(&self, entity: &EntityRef) -> Result<i64, Self::Error> {
        Ok(self.newest_first(entity)?.len() as i64)
    }

    async fn purge_all(&self, entity: &EntityRef) -> Result<u64, Self::Error> {
        let mut table = self.lock()?;
        let before = table.rows.len();
        table
            .rows
            .retain(|v| !(v.entity_type == entity.entity_type && v.entity_id == entity.entity_id));
        Ok((before - table.rows.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// MemoryEntityStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct EntityTable {
    next_id: HashMap<&'static str, DbId>,
    rows: HashMap<EntityRef, Attributes>,
    fail_next_write: bool,
}

/// Host entity rows held in memory, keyed by type tag and primary key.
#[derive(Debug, Default)]
pub struct MemoryEntityStore {
    inner: Mutex<EntityTable>,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next insert/update/delete fail.
    pub fn fail_next_write(&self) -> Result<(), MemoryStoreError> {
        self.lock()?.fail_next_write = true;
        Ok(())
    }

    /// The stored attributes of a row, as a fresh read would see them.
    pub fn find(&self, entity: &EntityRef) -> Result<Option<Attributes>, MemoryStoreError> {
        Ok(self.lock()?.rows.get(entity).cloned())
    }

    fn lock(&self) -> Result<MutexGuard<'_, EntityTable>, MemoryStoreError> {
        self.inner.lock().map_err(|_| MemoryStoreError::Poisoned)
    }

    fn take_failure(table: &mut EntityTable) -> Result<(), MemoryStoreError> {
        if table.fail_next_write {
            table.fail_next_write = false;
            return Err(MemoryStoreError::InjectedFailure);
        }
        Ok(())
    }

    fn row_ref(entity: &dyn Versionable) -> Result<EntityRef, MemoryStoreError> {
        entity
            .entity_ref()
            .ok_or(MemoryStoreError::MissingKey(entity.type_tag()))
    }
}

impl EntityPersister for MemoryEntityStore {
    type Error = MemoryStoreError;

    async fn insert(&self, entity: &mut dyn Versionable) -> Result<(), Self::Error> {
        let mut table = self.lock()?;
        Self::take_failure(&mut table)?;

        let tag = entity.type_tag();
        let id = match entity.key() {
            Some(id) => id,
            None => {
                let next = table.next_id.entry(tag).or_insert(0);
                *next += 1;
                *next
            }
        };
        let key_name = entity.key_name();
        entity.record_mut().set(key_name, id);

        table
            .rows
            .insert(EntityRef::new(tag, id), entity.record().attributes().clone());
        Ok(())
    }

    async fn update(&self, entity: &dyn Versionable) -> Result<(), Self::Error> {
        let mut table = self.lock()?;
        Self::take_failure(&mut table)?;

        let row_ref = Self::row_ref(entity)?;
        let row = table
            .rows
            .get_mut(&row_ref)
            .ok_or_else(|| MemoryStoreError::NotFound(row_ref.clone()))?;
        row.extend(entity.record().dirty());
        Ok(())
    }

    async fn delete(&self, entity: &dyn Versionable) -> Result<(), Self::Error> {
        let mut table = self.lock()?;
        Self::take_failure(&mut table)?;

        let row_ref = Self::row_ref(entity)?;
        table
            .rows
            .remove(&row_ref)
            .map(|_| ())
            .ok_or(MemoryStoreError::NotFound(row_ref))
    }
}
