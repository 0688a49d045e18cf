//! Contract between the controller and an injection runtime.
//!
//! The controller never inspects how a runtime discovers, wires or stores
//! components. It only boots a runtime through a [`RuntimeProvider`], drives
//! scope activation through [`InjectionRuntime`], and hands out the runtime's
//! registry handle.

use lattice_config::Config;

use crate::errors::{CleanupAggregateError, DeploymentError, RuntimeFault, UnsupportedScopeError};
use crate::scope::ScopeId;

/// Boots injection runtimes.
///
/// Each successful call returns an independent handle; a provider must not
/// carry instance state from one boot into the next.
pub trait RuntimeProvider {
    /// Handle produced by a successful boot.
    type Runtime: InjectionRuntime;

    /// Discovers and initialises every registrable component and extension.
    ///
    /// # Errors
    ///
    /// Returns [`DeploymentError`] when discovery fails or wiring is invalid.
    fn boot(&self, config: &Config) -> Result<Self::Runtime, DeploymentError>;
}

/// A booted injection runtime.
pub trait InjectionRuntime {
    /// Lookup facility handed to application code.
    ///
    /// Registries must not keep the runtime alive once it shuts down.
    type Registry: Clone;

    /// Scopes the runtime manages natively, in activation order.
    fn native_scopes(&self) -> Vec<ScopeId>;

    /// Returns `true` when `scope` is managed natively.
    fn supports(&self, scope: &ScopeId) -> bool {
        self.native_scopes().contains(scope)
    }

    /// Activates storage for `scope`.
    ///
    /// Activating an already active scope must succeed without touching its
    /// instances.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedScopeError`] when the scope is not native.
    fn activate_scope(&mut self, scope: &ScopeId) -> Result<(), UnsupportedScopeError>;

    /// Deactivates `scope` and destroys every instance it holds.
    ///
    /// Implementations must run every destruction callback even when some
    /// fail. Deactivating an inactive or unknown scope is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CleanupAggregateError`] listing each failed callback.
    fn deactivate_scope(&mut self, scope: &ScopeId) -> Result<(), CleanupAggregateError>;

    /// Returns the component registry, or `None` when it is unavailable.
    fn registry(&self) -> Option<Self::Registry>;

    /// Releases every runtime resource.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeFault`] when resources could not be released cleanly.
    fn shutdown(self) -> Result<(), RuntimeFault>;
}
