//! Ambient collaborators consulted when a version is written: who is acting,
//! and which request (if any) triggered the change.

use crate::types::DbId;

/// Request metadata captured on a version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub url: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Resolves the id of the acting principal, if any.
pub trait ActorResolver: Send + Sync {
    fn actor_id(&self) -> Option<DbId>;
}

impl<F> ActorResolver for F
where
    F: Fn() -> Option<DbId> + Send + Sync,
{
    fn actor_id(&self) -> Option<DbId> {
        self()
    }
}

/// Supplies the ambient request context. Returns `None` outside a request
/// (console commands, background jobs).
pub trait RequestContextProvider: Send + Sync {
    fn request_context(&self) -> Option<RequestContext>;
}

impl<F> RequestContextProvider for F
where
    F: Fn() -> Option<RequestContext> + Send + Sync,
{
    fn request_context(&self) -> Option<RequestContext> {
        self()
    }
}
