//! Version record: an immutable snapshot plus metadata referencing one entity.

use serde::Serialize;
use serde_json::Value;

use crate::action::VersionAction;
use crate::entity::EntityRef;
use crate::snapshot;
use crate::types::{Attributes, DbId, Timestamp};

/// Maximum length of `versions.reason`.
pub const REASON_MAX_LEN: usize = 100;

/// A persisted version. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Version {
    /// Globally increasing; the authoritative ordering key.
    pub id: DbId,
    pub entity_type: String,
    pub entity_id: DbId,
    pub action: VersionAction,
    pub user_id: Option<DbId>,
    pub reason: Option<String>,
    pub url: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    #[serde(skip)]
    pub model_data: Vec<u8>,
    #[serde(skip)]
    pub additional_data: Option<Vec<u8>>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Version {
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.entity_type.clone(), self.entity_id)
    }

    /// Decode the attribute map captured by this version.
    pub fn snapshot(&self) -> Result<Attributes, serde_json::Error> {
        snapshot::deserialize(&self.model_data)
    }

    /// Decode the out-of-band data captured by this version, if any.
    pub fn additional_data(&self) -> Result<Option<Value>, serde_json::Error> {
        snapshot::deserialize_additional(self.additional_data.as_deref())
    }
}

/// DTO for appending a version. The store assigns `id` and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVersion {
    pub entity: EntityRef,
    pub action: VersionAction,
    pub user_id: Option<DbId>,
    pub reason: Option<String>,
    pub url: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub model_data: Vec<u8>,
    pub additional_data: Option<Vec<u8>>,
}

/// Cut `reason` to at most `max_len` characters, on a char boundary.
///
/// Returns the reason and whether it was shortened.
pub fn truncate_reason(reason: &str, max_len: usize) -> (String, bool) {
    match reason.char_indices().nth(max_len) {
        Some((byte_idx, _)) => (reason[..byte_idx].to_string(), true),
        None => (reason.to_string(), false),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample(model_data: Vec<u8>, additional_data: Option<Vec<u8>>) -> Version {
        let now = chrono::Utc::now();
        Version {
            id: 1,
            entity_type: "user".to_string(),
            entity_id: 9,
            action: VersionAction::Create,
            user_id: None,
            reason: None,
            url: None,
            ip_address: None,
            user_agent: None,
            model_data,
            additional_data,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn snapshot_decodes_model_data() {
        let mut attrs = Attributes::new();
        attrs.insert("name".into(), json!("Rodrigo"));
        let version = sample(snapshot::serialize(&attrs).unwrap(), None);

        assert_eq!(version.snapshot().unwrap(), attrs);
        assert_eq!(version.additional_data().unwrap(), None);
        assert_eq!(version.entity_ref(), EntityRef::new("user", 9));
    }

    #[test]
    fn serialized_version_omits_blobs() {
        let version = sample(b"{}".to_vec(), Some(b"1".to_vec()));
        let json = serde_json::to_value(&version).unwrap();
        assert_eq!(json["action"], "create");
        assert!(json.get("model_data").is_none());
    }

    #[test]
    fn truncate_reason_respects_char_boundaries() {
        assert_eq!(truncate_reason("short", 100), ("short".to_string(), false));
        assert_eq!(truncate_reason("ééééé", 3), ("ééé".to_string(), true));
    }
}
