//! The versionable capability and the attribute record entities embed.
//!
//! A concrete entity type opts into versioning by embedding a [`Record`] and
//! implementing [`Versionable`]. The engine only ever talks to entities
//! through this trait: attribute access, dirty tracking, existence, and the
//! per-instance [`VersioningState`].

use std::any::Any;

use serde_json::Value;

use crate::action::PendingAction;
use crate::types::{Attributes, DbId};

// ---------------------------------------------------------------------------
// EntityRef
// ---------------------------------------------------------------------------

/// Polymorphic back-reference from a version to its entity: type tag + key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub entity_type: String,
    pub entity_id: DbId,
}

impl EntityRef {
    pub fn new(entity_type: impl Into<String>, entity_id: DbId) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id,
        }
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.entity_type, self.entity_id)
    }
}

// ---------------------------------------------------------------------------
// VersioningState
// ---------------------------------------------------------------------------

/// In-memory versioning flags of one entity instance.
///
/// Instance-local and unsynchronized: sharing one instance across concurrent
/// operations is the caller's problem.
#[derive(Debug, Clone)]
pub struct VersioningState {
    pub(crate) enabled: bool,
    pub(crate) force_next: bool,
    pub(crate) force_scoped: bool,
    pub(crate) force_deleting: bool,
    pub(crate) reason: Option<String>,
    pub(crate) data: Option<Value>,
    pub(crate) action: PendingAction,
}

impl Default for VersioningState {
    fn default() -> Self {
        Self {
            enabled: true,
            force_next: false,
            force_scoped: false,
            force_deleting: false,
            reason: None,
            data: None,
            action: PendingAction::default(),
        }
    }
}

impl VersioningState {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// `true` while a force-next flag is pending or a forced scope is active.
    pub fn is_forced(&self) -> bool {
        self.force_next || self.force_scoped
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn action(&self) -> &PendingAction {
        &self.action
    }

    pub fn action_mut(&mut self) -> &mut PendingAction {
        &mut self.action
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Attribute bag with dirty tracking, embedded by every versionable entity.
#[derive(Debug, Clone, Default)]
pub struct Record {
    attributes: Attributes,
    original: Attributes,
    exists: bool,
    versioning: VersioningState,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record for a row already loaded from storage (clean, existing).
    pub fn from_stored(attributes: Attributes) -> Self {
        Self {
            original: attributes.clone(),
            attributes,
            exists: true,
            versioning: VersioningState::default(),
        }
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.attributes.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.attributes.remove(field)
    }

    /// Overwrite the given attributes, keeping any others.
    pub fn fill(&mut self, attributes: Attributes) {
        self.attributes.extend(attributes);
    }

    /// Attributes whose value differs from the last synced state, including
    /// fields that are new since then.
    pub fn dirty(&self) -> Attributes {
        self.attributes
            .iter()
            .filter(|(field, value)| self.original.get(*field) != Some(*value))
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        self.attributes
            .iter()
            .any(|(field, value)| self.original.get(field) != Some(value))
    }

    /// Mark the current attributes as persisted.
    pub fn sync_original(&mut self) {
        self.original = self.attributes.clone();
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn set_exists(&mut self, exists: bool) {
        self.exists = exists;
    }

    pub fn versioning(&self) -> &VersioningState {
        &self.versioning
    }

    pub fn versioning_mut(&mut self) -> &mut VersioningState {
        &mut self.versioning
    }
}

// ---------------------------------------------------------------------------
// Versionable
// ---------------------------------------------------------------------------

/// Capability implemented by every entity type whose lifecycle is versioned.
///
/// Object safe: the type registry hands out `Box<dyn Versionable>` when
/// reconstructing a version of an arbitrary type.
pub trait Versionable: Send + Sync + 'static {
    /// Stable type tag stored in `versions.entity_type`.
    fn type_tag(&self) -> &'static str;

    fn record(&self) -> &Record;

    fn record_mut(&mut self) -> &mut Record;

    fn as_any(&self) -> &dyn Any;

    /// Fields ignored by change detection and diffs, on top of
    /// [`updated_at_column`](Versionable::updated_at_column).
    fn dont_version_fields(&self) -> &[&'static str] {
        &[]
    }

    fn key_name(&self) -> &'static str {
        "id"
    }

    fn created_at_column(&self) -> &'static str {
        "created_at"
    }

    fn updated_at_column(&self) -> &'static str {
        "updated_at"
    }

    /// `Some(column)` when the type soft-deletes.
    fn deleted_at_column(&self) -> Option<&'static str> {
        None
    }

    /// Erase all versions when the entity is permanently deleted.
    fn purge_versions_on_delete(&self) -> bool {
        false
    }

    // -- Provided ------------------------------------------------------------

    fn key(&self) -> Option<DbId> {
        self.record().get(self.key_name()).and_then(Value::as_i64)
    }

    fn entity_ref(&self) -> Option<EntityRef> {
        self.key().map(|id| EntityRef::new(self.type_tag(), id))
    }

    /// Don't-version fields, always including the last-modified column.
    fn excluded_fields(&self) -> Vec<&'static str> {
        let mut fields = self.dont_version_fields().to_vec();
        let updated_at = self.updated_at_column();
        if !fields.contains(&updated_at) {
            fields.push(updated_at);
        }
        fields
    }

    fn enable_versioning(&mut self) {
        self.record_mut().versioning_mut().enabled = true;
    }

    fn disable_versioning(&mut self) {
        self.record_mut().versioning_mut().enabled = false;
    }

    fn force_versioning_on_next_event(&mut self) {
        self.record_mut().versioning_mut().force_next = true;
    }

    fn cancel_force_versioning(&mut self) {
        self.record_mut().versioning_mut().force_next = false;
    }

    /// Reason recorded on the next version. Blank input clears it.
    fn set_versioning_reason(&mut self, reason: &str) {
        let trimmed = reason.trim();
        self.record_mut().versioning_mut().reason =
            (!trimmed.is_empty()).then(|| trimmed.to_string());
    }

    /// Out-of-band data recorded on the next version. Empty values clear it.
    fn set_versioning_data(&mut self, data: Value) {
        self.record_mut().versioning_mut().data = if is_empty_value(&data) {
            None
        } else {
            Some(data)
        };
    }

    /// Permanent delete: the type never soft-deletes, or a force delete is
    /// in progress.
    fn is_force_deleting(&self) -> bool {
        self.deleted_at_column().is_none() || self.record().versioning().force_deleting
    }
}

/// `null`, `""`, `[]`, `{}` and `false` count as "no data".
pub(crate) fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Number(_) => false,
    }
}
