//! Version actions and the per-instance action classifier.
//!
//! Every version row records why it was written. The classifier holds the
//! pending action for one save/delete cycle of a single entity instance: the
//! lifecycle hooks set it, the version-creation step consumes it.

use serde::{Deserialize, Serialize};

use crate::error::VersioningError;

// ---------------------------------------------------------------------------
// VersionAction
// ---------------------------------------------------------------------------

/// The classified cause of a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionAction {
    Create,
    Update,
    Delete,
    SoftDelete,
    Restore,
}

impl VersionAction {
    /// All actions, in lifecycle order.
    pub const ALL: [VersionAction; 5] = [
        Self::Create,
        Self::Update,
        Self::Delete,
        Self::SoftDelete,
        Self::Restore,
    ];

    /// String representation used in the `versions.action` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::SoftDelete => "soft-delete",
            Self::Restore => "restore",
        }
    }

    /// Parse a stored or caller-supplied action label.
    pub fn parse(label: &str) -> Result<Self, VersioningError> {
        match label {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "soft-delete" => Ok(Self::SoftDelete),
            "restore" => Ok(Self::Restore),
            other => Err(VersioningError::InvalidAction(other.to_string())),
        }
    }

    /// `true` for both permanent and soft deletes.
    pub fn is_delete(&self) -> bool {
        matches!(self, Self::Delete | Self::SoftDelete)
    }
}

impl std::fmt::Display for VersionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VersionAction {
    type Err = VersioningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// PendingAction
// ---------------------------------------------------------------------------

/// Transient action token for one lifecycle cycle. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingAction {
    action: Option<VersionAction>,
}

impl PendingAction {
    pub fn set(&mut self, action: VersionAction) {
        self.action = Some(action);
    }

    /// Set the action from its label, failing on anything unrecognized.
    pub fn set_label(&mut self, label: &str) -> Result<(), VersioningError> {
        self.action = Some(VersionAction::parse(label)?);
        Ok(())
    }

    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    pub fn reset(&mut self) {
        self.action = None;
    }

    pub fn current(&self) -> Option<VersionAction> {
        self.action
    }

    pub fn is_creating(&self) -> bool {
        self.action == Some(VersionAction::Create)
    }

    pub fn is_updating(&self) -> bool {
        self.action == Some(VersionAction::Update)
    }

    /// `true` for both `delete` and `soft-delete`.
    pub fn is_deleting(&self) -> bool {
        self.action.is_some_and(|a| a.is_delete())
    }

    pub fn is_restoring(&self) -> bool {
        self.action == Some(VersionAction::Restore)
    }

    // -- Lifecycle transitions ----------------------------------------------

    pub fn on_creating(&mut self) {
        self.set(VersionAction::Create);
    }

    /// Update hooks also fire while a delete or restore is in progress; an
    /// action that is already set wins.
    pub fn on_updating(&mut self) {
        if self.has_action() {
            return;
        }
        self.set(VersionAction::Update);
    }

    pub fn on_deleting(&mut self, permanent: bool) {
        let action = if permanent {
            VersionAction::Delete
        } else {
            VersionAction::SoftDelete
        };
        self.set(action);
    }

    pub fn on_restoring(&mut self) {
        self.set(VersionAction::Restore);
    }
}
