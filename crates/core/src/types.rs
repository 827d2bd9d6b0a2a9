/// Version ids and entity keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Attribute map of a versioned entity, keyed by column name.
///
/// Backed by `serde_json::Map`, whose equality does not depend on insertion
/// order.
pub type Attributes = serde_json::Map<String, serde_json::Value>;
