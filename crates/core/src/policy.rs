//! Should-version policy and scoped force versioning.

use std::ops::{Deref, DerefMut};

use crate::entity::Versionable;

/// Outcome of the should-version gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No version for this cycle.
    Skip,
    /// Write a version. `consume_force` is set when the pending force-next
    /// flag made the call and must be cleared once the write succeeds.
    Create { consume_force: bool },
}

impl Decision {
    pub fn should_create(&self) -> bool {
        matches!(self, Self::Create { .. })
    }
}

/// Evaluate the gate without touching any flag.
///
/// Rules, first match wins:
/// 1. versioning disabled on the instance: skip
/// 2. forced (scoped, or force-next): create
/// 3. not yet in storage: create
/// 4. create iff some dirty field is outside the don't-version set
pub fn evaluate<E>(entity: &E) -> Decision
where
    E: Versionable + ?Sized,
{
    let state = entity.record().versioning();

    if !state.enabled {
        return Decision::Skip;
    }

    if state.force_scoped {
        return Decision::Create {
            consume_force: false,
        };
    }

    if state.force_next {
        return Decision::Create {
            consume_force: true,
        };
    }

    if !entity.record().exists() {
        return Decision::Create {
            consume_force: false,
        };
    }

    let excluded = entity.excluded_fields();
    let has_versioned_change = entity
        .record()
        .dirty()
        .keys()
        .any(|field| !excluded.iter().any(|skip| *skip == field.as_str()));

    if has_versioned_change {
        Decision::Create {
            consume_force: false,
        }
    } else {
        Decision::Skip
    }
}

/// Answer the gate, consuming a pending force-next flag when it decided.
pub fn should_create_version<E>(entity: &mut E) -> bool
where
    E: Versionable + ?Sized,
{
    match evaluate(entity) {
        Decision::Skip => false,
        Decision::Create { consume_force } => {
            if consume_force {
                entity.cancel_force_versioning();
            }
            true
        }
    }
}

// ---------------------------------------------------------------------------
// Scoped force versioning
// ---------------------------------------------------------------------------

/// Guard that forces versioning on an entity for as long as it lives.
///
/// Dropping the guard restores the scoped-force flag to the value it had on
/// entry, so nesting works and early returns via `?` clean up too.
///
/// ```rust,ignore
/// let mut forced = ForcedVersioning::enter(&mut user);
/// versioner.save(&persister, &mut *forced).await?;
/// ```
pub struct ForcedVersioning<'a, E>
where
    E: Versionable + ?Sized,
{
    entity: &'a mut E,
    prior: bool,
}

impl<'a, E> ForcedVersioning<'a, E>
where
    E: Versionable + ?Sized,
{
    pub fn enter(entity: &'a mut E) -> Self {
        let state = entity.record_mut().versioning_mut();
        let prior = state.force_scoped;
        state.force_scoped = true;
        Self { entity, prior }
    }
}

impl<E> Deref for ForcedVersioning<'_, E>
where
    E: Versionable + ?Sized,
{
    type Target = E;

    fn deref(&self) -> &E {
        self.entity
    }
}

impl<E> DerefMut for ForcedVersioning<'_, E>
where
    E: Versionable + ?Sized,
{
    fn deref_mut(&mut self) -> &mut E {
        self.entity
    }
}

impl<E> Drop for ForcedVersioning<'_, E>
where
    E: Versionable + ?Sized,
{
    fn drop(&mut self) {
        self.entity.record_mut().versioning_mut().force_scoped = self.prior;
    }
}

/// Run `f` with versioning forced on `entity`, restoring the flag afterwards.
pub fn with_forced_versioning<E, R>(entity: &mut E, f: impl FnOnce(&mut E) -> R) -> R
where
    E: Versionable + ?Sized,
{
    let mut forced = ForcedVersioning::enter(entity);
    f(&mut *forced)
}
