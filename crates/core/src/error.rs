/// Boxed error raised by a [`VersionStore`](crate::store::VersionStore) or
/// [`EntityPersister`](crate::store::EntityPersister) implementation.
pub type StorageError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum VersioningError {
    #[error("Invalid versioning action '{0}'")]
    InvalidAction(String),

    #[error("No versioning action set for {entity_type}")]
    NoActionSet { entity_type: &'static str },

    #[error("Unknown versioned type '{0}'")]
    UnknownVersionedType(String),

    #[error("No baseline version to diff against for {entity_type} with id {entity_id}")]
    NoBaselineVersion { entity_type: String, entity_id: i64 },

    #[error("Entity {entity_type} has no primary key")]
    MissingEntityKey { entity_type: &'static str },

    #[error("Snapshot decode failed: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Passthrough of the underlying store or persister failure.
    #[error(transparent)]
    Storage(StorageError),
}

impl VersioningError {
    /// Wrap a store/persister error without changing how it displays.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage(Box::new(err))
    }
}
