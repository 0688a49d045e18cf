//! Test double for [`LifecycleReporter`] that records structured events for
//! assertions.

use std::sync::Mutex;

use lattice_config::Config;

use crate::bootstrap::BootstrapError;
use crate::errors::{CleanupAggregateError, ContainerError};
use crate::health::LifecycleReporter;
use crate::scope::ScopeId;
use crate::state::Operation;

/// Structured lifecycle events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// Bootstrap completed successfully.
    BootstrapSucceeded,
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// Boot started.
    BootStarting,
    /// Boot succeeded with the runtime's native scopes.
    BootSucceeded(Vec<ScopeId>),
    /// Boot failed with an error description.
    BootFailed(String),
    /// A scope became active.
    ScopeActivated(ScopeId),
    /// A scope was deactivated.
    ScopeDeactivated(ScopeId),
    /// Destruction callbacks failed for the named components.
    CleanupFailed(Vec<String>),
    /// An operation was refused.
    OperationRejected(Operation),
    /// The runtime handle was released.
    ShutdownCompleted,
}

/// Records lifecycle events for assertions.
#[derive(Debug, Default)]
pub struct RecordingLifecycleReporter {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingLifecycleReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: LifecycleEvent) {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .push(event);
    }
}

impl LifecycleReporter for RecordingLifecycleReporter {
    fn bootstrap_starting(&self) {
        self.record(LifecycleEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(LifecycleEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(LifecycleEvent::BootstrapFailed(error.to_string()));
    }

    fn boot_starting(&self) {
        self.record(LifecycleEvent::BootStarting);
    }

    fn boot_succeeded(&self, native_scopes: &[ScopeId]) {
        self.record(LifecycleEvent::BootSucceeded(native_scopes.to_vec()));
    }

    fn boot_failed(&self, error: &ContainerError) {
        self.record(LifecycleEvent::BootFailed(error.to_string()));
    }

    fn scope_activated(&self, scope: &ScopeId) {
        self.record(LifecycleEvent::ScopeActivated(scope.clone()));
    }

    fn scope_deactivated(&self, scope: &ScopeId) {
        self.record(LifecycleEvent::ScopeDeactivated(scope.clone()));
    }

    fn cleanup_failed(&self, error: &CleanupAggregateError) {
        self.record(LifecycleEvent::CleanupFailed(
            error
                .failures()
                .iter()
                .map(|failure| failure.component.clone())
                .collect(),
        ));
    }

    fn operation_rejected(&self, operation: Operation, _error: &ContainerError) {
        self.record(LifecycleEvent::OperationRejected(operation));
    }

    fn shutdown_completed(&self) {
        self.record(LifecycleEvent::ShutdownCompleted);
    }
}
