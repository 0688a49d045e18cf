//! Structured reporting for container lifecycle events.

use std::sync::Arc;

use lattice_config::Config;

use crate::bootstrap::BootstrapError;
use crate::errors::{CleanupAggregateError, ContainerError};
use crate::scope::ScopeId;
use crate::state::Operation;

const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait LifecycleReporter: Send + Sync {
    /// Invoked before configuration is loaded.
    fn bootstrap_starting(&self);

    /// Invoked once configuration and telemetry are ready.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked before the runtime boots.
    fn boot_starting(&self);

    /// Invoked after the runtime boots successfully.
    fn boot_succeeded(&self, native_scopes: &[ScopeId]);

    /// Invoked when boot fails.
    fn boot_failed(&self, error: &ContainerError);

    /// Invoked after a scope becomes active.
    fn scope_activated(&self, scope: &ScopeId);

    /// Invoked after a scope has been deactivated, whether or not cleanup
    /// succeeded.
    fn scope_deactivated(&self, scope: &ScopeId);

    /// Invoked when destruction callbacks fail.
    fn cleanup_failed(&self, error: &CleanupAggregateError);

    /// Invoked when an operation is refused before touching the runtime.
    fn operation_rejected(&self, operation: Operation, error: &ContainerError);

    /// Invoked once the runtime handle has been released.
    fn shutdown_completed(&self);
}

impl<T> LifecycleReporter for Arc<T>
where
    T: LifecycleReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn boot_starting(&self) {
        (**self).boot_starting();
    }

    fn boot_succeeded(&self, native_scopes: &[ScopeId]) {
        (**self).boot_succeeded(native_scopes);
    }

    fn boot_failed(&self, error: &ContainerError) {
        (**self).boot_failed(error);
    }

    fn scope_activated(&self, scope: &ScopeId) {
        (**self).scope_activated(scope);
    }

    fn scope_deactivated(&self, scope: &ScopeId) {
        (**self).scope_deactivated(scope);
    }

    fn cleanup_failed(&self, error: &CleanupAggregateError) {
        (**self).cleanup_failed(error);
    }

    fn operation_rejected(&self, operation: Operation, error: &ContainerError) {
        (**self).operation_rejected(operation, error);
    }

    fn shutdown_completed(&self) {
        (**self).shutdown_completed();
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredLifecycleReporter;

impl StructuredLifecycleReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LifecycleReporter for StructuredLifecycleReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "bootstrap_starting",
            "loading container configuration"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "bootstrap_succeeded",
            deployment_mode = %config.deployment_mode(),
            log_format = %config.log_format(),
            "container configuration ready"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: LIFECYCLE_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "container bootstrap failed"
        );
    }

    fn boot_starting(&self) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "boot_starting",
            "booting container"
        );
    }

    fn boot_succeeded(&self, native_scopes: &[ScopeId]) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "boot_succeeded",
            scopes = ?native_scopes.iter().map(ScopeId::as_str).collect::<Vec<_>>(),
            "container booted"
        );
    }

    fn boot_failed(&self, error: &ContainerError) {
        tracing::error!(
            target: LIFECYCLE_TARGET,
            event = "boot_failed",
            error = %error,
            "container boot failed"
        );
    }

    fn scope_activated(&self, scope: &ScopeId) {
        tracing::debug!(
            target: LIFECYCLE_TARGET,
            event = "scope_activated",
            scope = %scope,
            "scope activated"
        );
    }

    fn scope_deactivated(&self, scope: &ScopeId) {
        tracing::debug!(
            target: LIFECYCLE_TARGET,
            event = "scope_deactivated",
            scope = %scope,
            "scope deactivated"
        );
    }

    fn cleanup_failed(&self, error: &CleanupAggregateError) {
        for failure in error.failures() {
            tracing::warn!(
                target: LIFECYCLE_TARGET,
                event = "cleanup_failed",
                scope = %failure.scope,
                component = %failure.component,
                error = %failure.source,
                "component destruction failed"
            );
        }
    }

    fn operation_rejected(&self, operation: Operation, error: &ContainerError) {
        tracing::warn!(
            target: LIFECYCLE_TARGET,
            event = "operation_rejected",
            operation = %operation,
            error = %error,
            "lifecycle operation rejected"
        );
    }

    fn shutdown_completed(&self) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "shutdown_completed",
            "container shut down"
        );
    }
}
