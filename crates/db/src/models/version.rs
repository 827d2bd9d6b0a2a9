//! Version row model and its conversion into the engine's [`Version`].

use sqlx::FromRow;
use versionable_core::types::{DbId, Timestamp};
use versionable_core::{Version, VersionAction};

/// A row of the `versions` table as stored, with `action` still a label.
#[derive(Debug, Clone, FromRow)]
pub struct VersionRow {
    pub id: DbId,
    pub entity_type: String,
    pub entity_id: DbId,
    pub action: String,
    pub user_id: Option<DbId>,
    pub reason: Option<String>,
    pub url: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub model_data: Vec<u8>,
    pub additional_data: Option<Vec<u8>>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<VersionRow> for Version {
    type Error = sqlx::Error;

    /// Fails with [`sqlx::Error::Decode`] when the stored action label is
    /// not one of the known actions.
    fn try_from(row: VersionRow) -> Result<Self, Self::Error> {
        let action =
            VersionAction::parse(&row.action).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        Ok(Version {
            id: row.id,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            action,
            user_id: row.user_id,
            reason: row.reason,
            url: row.url,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            model_data: row.model_data,
            additional_data: row.additional_data,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
