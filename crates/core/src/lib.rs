//! Audit/versioning layer for mutable records.
//!
//! Every create, update, soft-delete, hard-delete, and restore of a tracked
//! entity can produce an immutable [`Version`] of its state. Versions can be
//! listed, diffed against each other, and reverted onto the live entity.
//!
//! - [`Versionable`] / [`Record`]: the capability an entity implements.
//! - [`Versioner`]: lifecycle hooks, drivers, diff, and revert.
//! - [`VersionStore`] / [`EntityPersister`]: persistence seams.
//! - [`memory`]: in-memory stores for embedding and tests.

pub mod action;
pub mod config;
pub mod context;
pub mod diff;
pub mod engine;
pub mod entity;
pub mod error;
pub mod memory;
pub mod policy;
pub mod registry;
pub mod snapshot;
pub mod store;
pub mod types;
pub mod version;

pub use action::{PendingAction, VersionAction};
pub use config::VersioningConfig;
pub use context::{ActorResolver, RequestContext, RequestContextProvider};
pub use engine::Versioner;
pub use entity::{EntityRef, Record, Versionable, VersioningState};
pub use error::VersioningError;
pub use policy::{should_create_version, with_forced_versioning, ForcedVersioning};
pub use registry::TypeRegistry;
pub use store::{EntityPersister, VersionStore};
pub use version::{NewVersion, Version};
