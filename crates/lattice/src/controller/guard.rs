//! RAII guard that keeps a scope active for a lexical block.

use crate::errors::ContainerError;
use crate::runtime::RuntimeProvider;
use crate::scope::ScopeId;

use super::{CONTROLLER_TARGET, ContainerController};

/// Stops its scope when dropped, if the guard started it.
///
/// Dropping the guard logs cleanup failures; call [`ScopeGuard::finish`] to
/// receive them instead.
#[must_use = "dropping the guard immediately stops the scope"]
pub struct ScopeGuard<'a, P>
where
    P: RuntimeProvider,
{
    controller: &'a ContainerController<P>,
    scope: ScopeId,
    armed: bool,
}

impl<'a, P> ScopeGuard<'a, P>
where
    P: RuntimeProvider,
{
    pub(super) const fn new(
        controller: &'a ContainerController<P>,
        scope: ScopeId,
        armed: bool,
    ) -> Self {
        Self {
            controller,
            scope,
            armed,
        }
    }

    /// Scope held by this guard.
    #[must_use]
    pub const fn scope(&self) -> &ScopeId {
        &self.scope
    }

    /// Returns `true` when dropping the guard will stop the scope.
    #[must_use]
    pub const fn owns_scope(&self) -> bool {
        self.armed
    }

    /// Stops the scope now and reports the outcome.
    ///
    /// # Errors
    ///
    /// Returns the error from [`ContainerController::stop_context`].
    pub fn finish(mut self) -> Result<(), ContainerError> {
        if !self.armed {
            return Ok(());
        }
        self.armed = false;
        self.controller.stop_context(&self.scope)
    }
}

impl<P> Drop for ScopeGuard<'_, P>
where
    P: RuntimeProvider,
{
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(error) = self.controller.stop_context(&self.scope) {
            tracing::warn!(
                target: CONTROLLER_TARGET,
                scope = %self.scope,
                error = %error,
                "scope guard failed to stop scope cleanly"
            );
        }
    }
}
