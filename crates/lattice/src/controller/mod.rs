//! Single control point for a runtime's lifecycle and its native scopes.
//!
//! The controller owns at most one runtime handle at a time. Every transition
//! runs under an internal mutex, so concurrent boot and shutdown calls from
//! different threads are serialised rather than racing.
//!
//! Fixed policies:
//!
//! - Booting an already booted controller fails with
//!   [`IllegalStateError`]; shut down first.
//! - Shutting down an unbooted controller fails with [`IllegalStateError`].
//!   Shutdown is therefore not idempotent, but a controller may be booted
//!   again after any shutdown, and each boot yields a fresh runtime.
//! - Shutdown stops active scopes in reverse activation order before
//!   releasing the runtime. The handle is released even when cleanup fails.
//! - Starting an active scope and stopping an inactive one are no-ops.
//! - A scope whose cleanup failed is still treated as stopped; the error
//!   names every component whose destruction callback failed.

mod guard;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use lattice_config::Config;

use crate::errors::{CleanupAggregateError, ContainerError, IllegalStateError, UnsupportedScopeError};
use crate::health::{LifecycleReporter, StructuredLifecycleReporter};
use crate::runtime::{InjectionRuntime, RuntimeProvider};
use crate::scope::ScopeId;
use crate::state::{ContainerState, Operation};

pub use guard::ScopeGuard;

const CONTROLLER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::controller");

/// Registry type exposed by the runtime a provider boots.
pub type RegistryOf<P> = <<P as RuntimeProvider>::Runtime as InjectionRuntime>::Registry;

/// Lifecycle facade over a runtime booted by `P`.
pub struct ContainerController<P>
where
    P: RuntimeProvider,
{
    config: Config,
    provider: P,
    reporter: Arc<dyn LifecycleReporter>,
    lifecycle: Mutex<Lifecycle<P::Runtime>>,
}

struct Lifecycle<R> {
    runtime: Option<R>,
    active: Vec<ScopeId>,
}

impl<R> Lifecycle<R> {
    const fn state(&self) -> ContainerState {
        match (&self.runtime, self.active.is_empty()) {
            (None, _) => ContainerState::Unbooted,
            (Some(_), true) => ContainerState::Booted,
            (Some(_), false) => ContainerState::ContextsActive,
        }
    }
}

impl<P> ContainerController<P>
where
    P: RuntimeProvider,
{
    /// Builds an unbooted controller.
    #[must_use]
    pub fn new(config: Config, provider: P, reporter: Arc<dyn LifecycleReporter>) -> Self {
        Self {
            config,
            provider,
            reporter,
            lifecycle: Mutex::new(Lifecycle {
                runtime: None,
                active: Vec::new(),
            }),
        }
    }

    /// Builds an unbooted controller with default configuration that reports
    /// through `tracing`.
    #[must_use]
    pub fn standalone(provider: P) -> Self {
        Self::new(
            Config::default(),
            provider,
            Arc::new(StructuredLifecycleReporter::new()),
        )
    }

    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the runtime provider.
    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ContainerState {
        self.lock().state()
    }

    /// Returns `true` while a runtime handle is live.
    #[must_use]
    pub fn is_booted(&self) -> bool {
        self.state().is_booted()
    }

    /// Active scopes in activation order.
    #[must_use]
    pub fn active_scopes(&self) -> Vec<ScopeId> {
        self.lock().active.clone()
    }

    /// Boots the runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Deployment`] when the provider fails, leaving
    /// the controller unbooted, [`ContainerError::IllegalState`] when already
    /// booted, and [`ContainerError::HostManaged`] in managed deployments.
    pub fn boot_container(&self) -> Result<(), ContainerError> {
        self.ensure_owned(Operation::Boot)?;
        let mut lifecycle = self.lock();
        if lifecycle.runtime.is_some() {
            return Err(self.illegal_state(Operation::Boot, lifecycle.state()));
        }

        self.reporter.boot_starting();
        match self.provider.boot(&self.config) {
            Ok(runtime) => {
                let scopes = runtime.native_scopes();
                lifecycle.runtime = Some(runtime);
                lifecycle.active.clear();
                self.reporter.boot_succeeded(&scopes);
                Ok(())
            }
            Err(source) => {
                let error = ContainerError::Deployment(source);
                self.reporter.boot_failed(&error);
                Err(error)
            }
        }
    }

    /// Stops every active scope and releases the runtime.
    ///
    /// The controller is unbooted afterwards even when an error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::IllegalState`] when unbooted,
    /// [`ContainerError::Shutdown`] when the runtime fails to release its
    /// resources (carrying any cleanup failures as well), and otherwise
    /// [`ContainerError::Cleanup`] when destruction callbacks failed.
    pub fn shutdown_container(&self) -> Result<(), ContainerError> {
        self.ensure_owned(Operation::Shutdown)?;
        let mut guard = self.lock();
        let Lifecycle { runtime, active } = &mut *guard;
        let Some(mut handle) = runtime.take() else {
            return Err(self.illegal_state(Operation::Shutdown, ContainerState::Unbooted));
        };

        let mut cleanup = CleanupAggregateError::default();
        while let Some(scope) = active.pop() {
            self.deactivate(&mut handle, &scope, &mut cleanup);
        }

        let released = handle.shutdown();
        self.reporter.shutdown_completed();
        match released {
            Ok(()) => cleanup.into_result().map_err(ContainerError::from),
            Err(fault) => Err(ContainerError::Shutdown {
                fault,
                cleanup: cleanup.into_result().err(),
            }),
        }
    }

    /// Activates every scope the runtime manages natively.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::IllegalState`] when unbooted.
    pub fn start_contexts(&self) -> Result<(), ContainerError> {
        let mut guard = self.lock();
        let Lifecycle { runtime, active } = &mut *guard;
        let Some(runtime) = runtime.as_mut() else {
            return Err(self.illegal_state(Operation::StartContexts, ContainerState::Unbooted));
        };

        for scope in runtime.native_scopes() {
            if active.contains(&scope) {
                continue;
            }
            runtime.activate_scope(&scope)?;
            self.reporter.scope_activated(&scope);
            active.push(scope);
        }
        Ok(())
    }

    /// Deactivates every active scope, destroying all instances they hold.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::IllegalState`] when unbooted and
    /// [`ContainerError::Cleanup`] listing every failed destruction callback.
    pub fn stop_contexts(&self) -> Result<(), ContainerError> {
        let mut guard = self.lock();
        let Lifecycle { runtime, active } = &mut *guard;
        let Some(runtime) = runtime.as_mut() else {
            return Err(self.illegal_state(Operation::StopContexts, ContainerState::Unbooted));
        };

        let mut cleanup = CleanupAggregateError::default();
        while let Some(scope) = active.pop() {
            self.deactivate(runtime, &scope, &mut cleanup);
        }
        cleanup.into_result().map_err(ContainerError::from)
    }

    /// Activates a single native scope.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::IllegalState`] when unbooted and
    /// [`ContainerError::UnsupportedScope`] when the runtime does not manage
    /// `scope`; neither touches other scopes.
    pub fn start_context(&self, scope: &ScopeId) -> Result<(), ContainerError> {
        self.activate(Operation::StartContext, scope).map(|_| ())
    }

    /// Deactivates a single scope, destroying its instances.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::IllegalState`] when unbooted,
    /// [`ContainerError::UnsupportedScope`] for scopes the runtime does not
    /// manage, and [`ContainerError::Cleanup`] when destruction callbacks
    /// failed.
    pub fn stop_context(&self, scope: &ScopeId) -> Result<(), ContainerError> {
        let mut guard = self.lock();
        let Lifecycle { runtime, active } = &mut *guard;
        let Some(runtime) = runtime.as_mut() else {
            return Err(self.illegal_state(Operation::StopContext, ContainerState::Unbooted));
        };
        self.ensure_supported(runtime, Operation::StopContext, scope)?;

        let Some(position) = active.iter().position(|candidate| candidate == scope) else {
            return Ok(());
        };
        active.remove(position);

        let mut cleanup = CleanupAggregateError::default();
        self.deactivate(runtime, scope, &mut cleanup);
        cleanup.into_result().map_err(ContainerError::from)
    }

    /// Starts `scope` and returns a guard that stops it again when dropped.
    ///
    /// When the scope was already active the guard leaves it running.
    ///
    /// # Errors
    ///
    /// Fails for the same reasons as [`Self::start_context`].
    pub fn scoped(&self, scope: ScopeId) -> Result<ScopeGuard<'_, P>, ContainerError> {
        let started = self.activate(Operation::StartContext, &scope)?;
        Ok(ScopeGuard::new(self, scope, started))
    }

    /// Returns the runtime's registry, or `None` while unbooted.
    #[must_use]
    pub fn component_registry(&self) -> Option<RegistryOf<P>> {
        self.lock()
            .runtime
            .as_ref()
            .and_then(InjectionRuntime::registry)
    }

    /// Activates `scope`, returning `true` when this call started it.
    fn activate(&self, operation: Operation, scope: &ScopeId) -> Result<bool, ContainerError> {
        let mut guard = self.lock();
        let Lifecycle { runtime, active } = &mut *guard;
        let Some(runtime) = runtime.as_mut() else {
            return Err(self.illegal_state(operation, ContainerState::Unbooted));
        };
        self.ensure_supported(runtime, operation, scope)?;

        if active.contains(scope) {
            return Ok(false);
        }
        runtime.activate_scope(scope)?;
        self.reporter.scope_activated(scope);
        active.push(scope.clone());
        Ok(true)
    }

    fn deactivate(
        &self,
        runtime: &mut P::Runtime,
        scope: &ScopeId,
        cleanup: &mut CleanupAggregateError,
    ) {
        if let Err(failures) = runtime.deactivate_scope(scope) {
            self.reporter.cleanup_failed(&failures);
            cleanup.absorb(failures);
        }
        self.reporter.scope_deactivated(scope);
    }

    fn ensure_supported(
        &self,
        runtime: &P::Runtime,
        operation: Operation,
        scope: &ScopeId,
    ) -> Result<(), ContainerError> {
        if runtime.supports(scope) {
            return Ok(());
        }
        let error = ContainerError::from(UnsupportedScopeError {
            scope: scope.clone(),
            supported: runtime.native_scopes(),
        });
        self.reporter.operation_rejected(operation, &error);
        Err(error)
    }

    fn ensure_owned(&self, operation: Operation) -> Result<(), ContainerError> {
        if self.config.deployment_mode().owns_container() {
            return Ok(());
        }
        let error = ContainerError::HostManaged { operation };
        self.reporter.operation_rejected(operation, &error);
        Err(error)
    }

    fn illegal_state(&self, operation: Operation, state: ContainerState) -> ContainerError {
        let error = ContainerError::from(IllegalStateError { operation, state });
        self.reporter.operation_rejected(operation, &error);
        error
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle<P::Runtime>> {
        self.lifecycle
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

impl<P> fmt::Debug for ContainerController<P>
where
    P: RuntimeProvider,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lifecycle = self.lock();
        f.debug_struct("ContainerController")
            .field("config", &self.config)
            .field("state", &lifecycle.state())
            .field("active", &lifecycle.active)
            .finish_non_exhaustive()
    }
}

impl<P> Drop for ContainerController<P>
where
    P: RuntimeProvider,
{
    fn drop(&mut self) {
        let booted = self.lock().runtime.is_some();
        if !booted {
            return;
        }
        if let Err(error) = self.shutdown_container() {
            tracing::warn!(
                target: CONTROLLER_TARGET,
                error = %error,
                "container shutdown on drop reported failures"
            );
        }
    }
}
