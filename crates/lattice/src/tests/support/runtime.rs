//! Test runtime provider: journals every runtime call and supports injected
//! boot, cleanup and shutdown failures.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, Weak};

use lattice_config::Config;

use crate::errors::{
    CleanupAggregateError, CleanupFailure, DeploymentError, RuntimeFault, UnsupportedScopeError,
};
use crate::runtime::{InjectionRuntime, RuntimeProvider};
use crate::scope::ScopeId;

/// Runtime interaction recorded by [`RecordingProvider`].
///
/// The `usize` is the boot generation of the runtime involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCall {
    /// A runtime was booted.
    Boot(usize),
    /// A scope was activated.
    Activate(usize, ScopeId),
    /// A scope was deactivated.
    Deactivate(usize, ScopeId),
    /// A runtime was shut down.
    Shutdown(usize),
}

#[derive(Default)]
struct ProviderState {
    boots: usize,
    calls: Vec<RuntimeCall>,
    boot_failure: Option<String>,
    cleanup_failures: HashMap<ScopeId, Vec<String>>,
    shutdown_failure: Option<String>,
}

/// Provider that records calls and supports injected failures.
#[derive(Clone)]
pub struct RecordingProvider {
    native: Vec<ScopeId>,
    state: Arc<Mutex<ProviderState>>,
}

impl Default for RecordingProvider {
    fn default() -> Self {
        Self::with_native_scopes(ScopeId::BUILT_IN)
    }
}

impl RecordingProvider {
    /// Provider whose runtimes manage exactly `scopes`.
    #[must_use]
    pub fn with_native_scopes(scopes: impl IntoIterator<Item = ScopeId>) -> Self {
        Self {
            native: scopes.into_iter().collect(),
            state: Arc::new(Mutex::new(ProviderState::default())),
        }
    }

    /// Makes every subsequent boot fail with `message`.
    pub fn fail_boot(&self, message: impl Into<String>) {
        self.lock().boot_failure = Some(message.into());
    }

    /// Lets boots succeed again.
    pub fn heal_boot(&self) {
        self.lock().boot_failure = None;
    }

    /// Makes destruction callbacks for `components` fail when `scope` stops.
    pub fn fail_cleanup(&self, scope: ScopeId, components: &[&str]) {
        self.lock().cleanup_failures.insert(
            scope,
            components.iter().map(|name| (*name).to_owned()).collect(),
        );
    }

    /// Makes runtime shutdown fail with `message`.
    pub fn fail_shutdown(&self, message: impl Into<String>) {
        self.lock().shutdown_failure = Some(message.into());
    }

    /// Returns every recorded runtime call.
    #[must_use]
    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.lock().calls.clone()
    }

    /// Number of successful boots.
    #[must_use]
    pub fn boots(&self) -> usize {
        self.lock().boots
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ProviderState> {
        self.state.lock().expect("provider state mutex poisoned")
    }
}

impl RuntimeProvider for RecordingProvider {
    type Runtime = RecordingRuntime;

    fn boot(&self, _config: &Config) -> Result<Self::Runtime, DeploymentError> {
        let mut state = self.lock();
        if let Some(message) = state.boot_failure.clone() {
            return Err(DeploymentError::with_source(
                "component discovery failed",
                io::Error::other(message),
            ));
        }
        state.boots += 1;
        let generation = state.boots;
        state.calls.push(RuntimeCall::Boot(generation));
        Ok(RecordingRuntime {
            generation,
            native: self.native.clone(),
            active: Vec::new(),
            liveness: Arc::new(()),
            state: Arc::clone(&self.state),
        })
    }
}

/// Runtime handle produced by [`RecordingProvider`].
pub struct RecordingRuntime {
    generation: usize,
    native: Vec<ScopeId>,
    active: Vec<ScopeId>,
    liveness: Arc<()>,
    state: Arc<Mutex<ProviderState>>,
}

impl RecordingRuntime {
    fn record(&self, call: RuntimeCall) {
        self.state
            .lock()
            .expect("provider state mutex poisoned")
            .calls
            .push(call);
    }
}

impl InjectionRuntime for RecordingRuntime {
    type Registry = RecordingRegistry;

    fn native_scopes(&self) -> Vec<ScopeId> {
        self.native.clone()
    }

    fn activate_scope(&mut self, scope: &ScopeId) -> Result<(), UnsupportedScopeError> {
        if !self.native.contains(scope) {
            return Err(UnsupportedScopeError {
                scope: scope.clone(),
                supported: self.native.clone(),
            });
        }
        self.record(RuntimeCall::Activate(self.generation, scope.clone()));
        if !self.active.contains(scope) {
            self.active.push(scope.clone());
        }
        Ok(())
    }

    fn deactivate_scope(&mut self, scope: &ScopeId) -> Result<(), CleanupAggregateError> {
        self.record(RuntimeCall::Deactivate(self.generation, scope.clone()));
        self.active.retain(|candidate| candidate != scope);
        let failing = self
            .state
            .lock()
            .expect("provider state mutex poisoned")
            .cleanup_failures
            .get(scope)
            .cloned()
            .unwrap_or_default();
        CleanupAggregateError::new(
            failing
                .into_iter()
                .map(|component| CleanupFailure {
                    scope: scope.clone(),
                    component,
                    source: Box::new(io::Error::other("destruction callback failed")),
                })
                .collect(),
        )
        .into_result()
    }

    fn registry(&self) -> Option<Self::Registry> {
        Some(RecordingRegistry {
            generation: self.generation,
            liveness: Arc::downgrade(&self.liveness),
        })
    }

    fn shutdown(self) -> Result<(), RuntimeFault> {
        self.record(RuntimeCall::Shutdown(self.generation));
        let failure = self
            .state
            .lock()
            .expect("provider state mutex poisoned")
            .shutdown_failure
            .clone();
        match failure {
            Some(message) => Err(RuntimeFault::new(message)),
            None => Ok(()),
        }
    }
}

/// Registry handle that tracks whether its runtime is still alive.
#[derive(Debug, Clone)]
pub struct RecordingRegistry {
    generation: usize,
    liveness: Weak<()>,
}

impl RecordingRegistry {
    /// Boot generation of the runtime that issued this registry.
    #[must_use]
    pub const fn generation(&self) -> usize {
        self.generation
    }

    /// Returns `true` while the issuing runtime has not been dropped.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.liveness.strong_count() > 0
    }
}
