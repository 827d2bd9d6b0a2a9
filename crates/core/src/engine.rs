//! The version lifecycle engine.
//!
//! [`Versioner`] observes an entity's lifecycle. Hosts that run their own
//! persistence call the hooks directly, in the order
//! `creating`/`updating`/`deleting`/`restoring` → host write → `saved` or
//! `deleted`. Hosts that implement [`EntityPersister`] can use the
//! [`save`](Versioner::save), [`delete`](Versioner::delete),
//! [`force_delete`](Versioner::force_delete) and
//! [`restore`](Versioner::restore) drivers, which run the whole cycle.
//!
//! After a version is written, or the gate declines one, the pending action
//! is reset. A failed write leaves the action and force flag untouched so the
//! caller can retry the identical operation.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use crate::config::VersioningConfig;
use crate::context::{ActorResolver, RequestContext, RequestContextProvider};
use crate::diff::diff_attributes;
use crate::entity::{EntityRef, Versionable};
use crate::error::VersioningError;
use crate::policy::{self, Decision};
use crate::registry::TypeRegistry;
use crate::snapshot;
use crate::store::{EntityPersister, VersionStore};
use crate::types::{Attributes, DbId};
use crate::version::{truncate_reason, NewVersion, Version};

/// Default page size for [`Versioner::versions`].
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Largest page [`Versioner::versions`] will return.
pub const MAX_PAGE_SIZE: i64 = 500;

/// Version lifecycle engine bound to one [`VersionStore`].
pub struct Versioner<S> {
    store: S,
    registry: TypeRegistry,
    config: VersioningConfig,
    actor: Option<Arc<dyn ActorResolver>>,
    request: Option<Arc<dyn RequestContextProvider>>,
}

impl<S> Versioner<S>
where
    S: VersionStore,
{
    pub fn new(store: S, registry: TypeRegistry) -> Self {
        Self {
            store,
            registry,
            config: VersioningConfig::default(),
            actor: None,
            request: None,
        }
    }

    pub fn with_config(mut self, config: VersioningConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_actor_resolver(mut self, actor: Arc<dyn ActorResolver>) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_request_context(mut self, request: Arc<dyn RequestContextProvider>) -> Self {
        self.request = Some(request);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    // -----------------------------------------------------------------------
    // Lifecycle hooks
    // -----------------------------------------------------------------------

    pub fn creating(&self, entity: &mut dyn Versionable) {
        entity.record_mut().versioning_mut().action.on_creating();
    }

    /// No-op when a delete or restore already classified the cycle.
    pub fn updating(&self, entity: &mut dyn Versionable) {
        entity.record_mut().versioning_mut().action.on_updating();
    }

    pub fn deleting(&self, entity: &mut dyn Versionable) {
        let permanent = entity.is_force_deleting();
        entity
            .record_mut()
            .versioning_mut()
            .action
            .on_deleting(permanent);
    }

    pub fn restoring(&self, entity: &mut dyn Versionable) {
        entity.record_mut().versioning_mut().action.on_restoring();
    }

    /// Post-save hook: write a version for the classified action.
    pub async fn saved(
        &self,
        entity: &mut dyn Versionable,
    ) -> Result<Option<Version>, VersioningError> {
        self.create_new_version(entity).await
    }

    /// Post-delete hook. A permanent delete of a purge-on-delete type erases
    /// the history instead of adding to it.
    pub async fn deleted(
        &self,
        entity: &mut dyn Versionable,
    ) -> Result<Option<Version>, VersioningError> {
        if entity.is_force_deleting() && entity.purge_versions_on_delete() {
            self.purge_versions(entity).await?;
            entity.record_mut().versioning_mut().action.reset();
            return Ok(None);
        }
        self.create_new_version(entity).await
    }

    // -----------------------------------------------------------------------
    // Version creation
    // -----------------------------------------------------------------------

    /// Write a version for the pending action if the gate allows it.
    ///
    /// Fails with [`VersioningError::NoActionSet`] when no lifecycle hook ran
    /// first.
    pub async fn create_new_version(
        &self,
        entity: &mut dyn Versionable,
    ) -> Result<Option<Version>, VersioningError> {
        let action = entity
            .record()
            .versioning()
            .action
            .current()
            .ok_or(VersioningError::NoActionSet {
                entity_type: entity.type_tag(),
            })?;

        let consume_force = match policy::evaluate(&*entity) {
            Decision::Skip => {
                tracing::debug!(
                    entity_type = entity.type_tag(),
                    entity_id = ?entity.key(),
                    action = %action,
                    "No versioned change, skipping version"
                );
                entity.record_mut().versioning_mut().action.reset();
                return Ok(None);
            }
            Decision::Create { consume_force } => consume_force,
        };

        let entity_ref = entity.entity_ref().ok_or(VersioningError::MissingEntityKey {
            entity_type: entity.type_tag(),
        })?;

        let new_version = self.build_version(&*entity, entity_ref, action)?;
        let version = self
            .store
            .append(new_version)
            .await
            .map_err(VersioningError::storage)?;

        let state = entity.record_mut().versioning_mut();
        if consume_force {
            state.force_next = false;
        }
        state.reason = None;
        state.data = None;
        state.action.reset();

        tracing::debug!(
            entity_type = %version.entity_type,
            entity_id = version.entity_id,
            version_id = version.id,
            action = %version.action,
            "Version created"
        );

        Ok(Some(version))
    }

    fn build_version(
        &self,
        entity: &dyn Versionable,
        entity_ref: EntityRef,
        action: crate::action::VersionAction,
    ) -> Result<NewVersion, VersioningError> {
        let mut attributes = entity.record().attributes().clone();
        snapshot::strip_fields(&mut attributes, &entity.excluded_fields());
        let model_data = snapshot::serialize(&attributes)?;

        let state = entity.record().versioning();
        let additional_data = snapshot::serialize_additional(state.data())?;

        let reason = state.reason().map(|reason| {
            let (reason, truncated) = truncate_reason(reason, self.config.reason_max_len);
            if truncated {
                tracing::warn!(
                    entity = %entity_ref,
                    max_len = self.config.reason_max_len,
                    "Versioning reason truncated"
                );
            }
            reason
        });

        let request = self
            .request
            .as_ref()
            .and_then(|provider| provider.request_context());
        let RequestContext {
            url,
            ip_address,
            user_agent,
        } = match request {
            Some(ctx) => ctx,
            None => RequestContext {
                url: self.config.console_url.clone(),
                ..RequestContext::default()
            },
        };

        Ok(NewVersion {
            entity: entity_ref,
            action,
            user_id: self.actor.as_ref().and_then(|actor| actor.actor_id()),
            reason,
            url,
            ip_address,
            user_agent,
            model_data,
            additional_data,
        })
    }

    async fn purge_versions(&self, entity: &dyn Versionable) -> Result<u64, VersioningError> {
        let entity_ref = entity.entity_ref().ok_or(VersioningError::MissingEntityKey {
            entity_type: entity.type_tag(),
        })?;
        let purged = self
            .store
            .purge_all(&entity_ref)
            .await
            .map_err(VersioningError::storage)?;
        tracing::info!(entity = %entity_ref, purged, "Purged versions on delete");
        Ok(purged)
    }

    // -----------------------------------------------------------------------
    // Lifecycle drivers
    // -----------------------------------------------------------------------

    /// Insert or update `entity` through `persister` and version the change.
    pub async fn save<P>(
        &self,
        persister: &P,
        entity: &mut dyn Versionable,
    ) -> Result<Option<Version>, VersioningError>
    where
        P: EntityPersister,
    {
        let inserting = !entity.record().exists();
        if inserting {
            self.creating(entity);
        } else {
            self.updating(entity);
        }

        if inserting || entity.record().is_dirty() {
            touch_timestamps(entity, inserting);
        }

        if inserting {
            persister
                .insert(entity)
                .await
                .map_err(VersioningError::storage)?;
            entity.record_mut().set_exists(true);
        } else if entity.record().is_dirty() {
            persister
                .update(entity)
                .await
                .map_err(VersioningError::storage)?;
        }

        let version = self.saved(entity).await?;
        entity.record_mut().sync_original();
        Ok(version)
    }

    /// Delete `entity`: soft when its type has a deleted-at column,
    /// permanent otherwise.
    pub async fn delete<P>(
        &self,
        persister: &P,
        entity: &mut dyn Versionable,
    ) -> Result<Option<Version>, VersioningError>
    where
        P: EntityPersister,
    {
        self.deleting(entity);

        match entity.deleted_at_column() {
            Some(column) if !entity.is_force_deleting() => {
                let now = now_value();
                let updated_at = entity.updated_at_column();
                entity.record_mut().set(column, now.clone());
                entity.record_mut().set(updated_at, now);
                persister
                    .update(entity)
                    .await
                    .map_err(VersioningError::storage)?;
            }
            _ => {
                persister
                    .delete(entity)
                    .await
                    .map_err(VersioningError::storage)?;
                entity.record_mut().set_exists(false);
            }
        }

        let version = self.deleted(entity).await?;
        entity.record_mut().sync_original();
        Ok(version)
    }

    /// Permanently delete `entity`, even if its type soft-deletes.
    pub async fn force_delete<P>(
        &self,
        persister: &P,
        entity: &mut dyn Versionable,
    ) -> Result<Option<Version>, VersioningError>
    where
        P: EntityPersister,
    {
        entity.record_mut().versioning_mut().force_deleting = true;
        let result = self.delete(persister, entity).await;
        entity.record_mut().versioning_mut().force_deleting = false;
        result
    }

    /// Clear the deleted-at column of a soft-deleted entity and save it as a
    /// `restore`. Types without soft deletes are left alone.
    pub async fn restore<P>(
        &self,
        persister: &P,
        entity: &mut dyn Versionable,
    ) -> Result<Option<Version>, VersioningError>
    where
        P: EntityPersister,
    {
        let Some(column) = entity.deleted_at_column() else {
            return Ok(None);
        };

        self.restoring(entity);
        entity.record_mut().set(column, Value::Null);
        self.save(persister, entity).await
    }

    // -----------------------------------------------------------------------
    // Version access
    // -----------------------------------------------------------------------

    pub async fn current_version(
        &self,
        entity: &EntityRef,
    ) -> Result<Option<Version>, VersioningError> {
        self.store
            .current_version(entity)
            .await
            .map_err(VersioningError::storage)
    }

    pub async fn previous_version(
        &self,
        entity: &EntityRef,
    ) -> Result<Option<Version>, VersioningError> {
        self.store
            .previous_version(entity)
            .await
            .map_err(VersioningError::storage)
    }

    pub async fn version_by_id(
        &self,
        entity: &EntityRef,
        id: DbId,
    ) -> Result<Option<Version>, VersioningError> {
        self.store
            .by_id(entity, id)
            .await
            .map_err(VersioningError::storage)
    }

    /// Versions of `entity`, newest first. `limit` defaults to
    /// [`DEFAULT_PAGE_SIZE`] and is capped at [`MAX_PAGE_SIZE`].
    pub async fn versions(
        &self,
        entity: &EntityRef,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Version>, VersioningError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(0, MAX_PAGE_SIZE);
        let offset = offset.unwrap_or(0).max(0);
        self.store
            .list(entity, limit, offset)
            .await
            .map_err(VersioningError::storage)
    }

    pub async fn version_count(&self, entity: &EntityRef) -> Result<i64, VersioningError> {
        self.store
            .count(entity)
            .await
            .map_err(VersioningError::storage)
    }

    /// Rebuild the entity captured by `version` as a new, existing instance
    /// of its recorded type.
    pub fn model(&self, version: &Version) -> Result<Box<dyn Versionable>, VersioningError> {
        let mut model = self.registry.resolve(&version.entity_type)?;
        let attributes = version.snapshot()?;
        let data = version.additional_data()?;

        let record = model.record_mut();
        record.fill(attributes);
        record.set_exists(true);
        record.versioning_mut().data = data;
        Ok(model)
    }

    /// The instance captured by version `id` of `entity`, if that version
    /// exists.
    pub async fn version_model(
        &self,
        entity: &EntityRef,
        id: DbId,
    ) -> Result<Option<Box<dyn Versionable>>, VersioningError> {
        match self.version_by_id(entity, id).await? {
            Some(version) => self.model(&version).map(Some),
            None => Ok(None),
        }
    }

    // -----------------------------------------------------------------------
    // Diff / revert
    // -----------------------------------------------------------------------

    /// What `version` changed relative to `against`, or relative to the
    /// entity's current version when `against` is `None`.
    ///
    /// Reports `version`'s values for every non-excluded baseline field that
    /// differs.
    pub async fn diff(
        &self,
        version: &Version,
        against: Option<&Version>,
    ) -> Result<Attributes, VersioningError> {
        let model = self.model(version)?;
        let excluded = model.excluded_fields();

        let baseline = match against {
            Some(other) => other.snapshot()?,
            None => {
                let entity_ref = version.entity_ref();
                let current = self.current_version(&entity_ref).await?.ok_or_else(|| {
                    VersioningError::NoBaselineVersion {
                        entity_type: entity_ref.entity_type.clone(),
                        entity_id: entity_ref.entity_id,
                    }
                })?;
                current.snapshot()?
            }
        };

        Ok(diff_attributes(
            model.record().attributes(),
            &baseline,
            &excluded,
        ))
    }

    /// Make `version` the entity's live state.
    ///
    /// Rebuilds the captured instance, drops the don't-version fields so the
    /// live row keeps fresh housekeeping values, and saves it as an update,
    /// which writes a new version. Returns the reverted instance.
    pub async fn revert<P>(
        &self,
        persister: &P,
        version: &Version,
    ) -> Result<Box<dyn Versionable>, VersioningError>
    where
        P: EntityPersister,
    {
        let mut model = self.model(version)?;
        for field in model.excluded_fields() {
            model.record_mut().remove(field);
        }

        tracing::info!(
            entity = %version.entity_ref(),
            version_id = version.id,
            "Reverting to version"
        );

        self.save(persister, model.as_mut()).await?;
        Ok(model)
    }
}

/// Stamp the housekeeping timestamps before a write.
fn touch_timestamps(entity: &mut dyn Versionable, inserting: bool) {
    let now = now_value();
    if inserting {
        let created_at = entity.created_at_column();
        if entity.record().get(created_at).is_none() {
            entity.record_mut().set(created_at, now.clone());
        }
    }
    let updated_at = entity.updated_at_column();
    entity.record_mut().set(updated_at, now);
}

fn now_value() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
}
