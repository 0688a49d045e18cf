//! Lifecycle control for a dependency-injection container running in a
//! standalone process.
//!
//! [`ContainerController`] is the single control point: it boots a runtime
//! through a [`RuntimeProvider`], starts and stops the contextual scopes the
//! runtime manages natively, hands out the runtime's component registry while
//! booted, and shuts everything down again. The runtime itself stays opaque;
//! the controller only talks to it through [`InjectionRuntime`].
//!
//! Bootstrap loads layered configuration from [`lattice_config`], installs a
//! `tracing` subscriber, and reports every lifecycle transition through a
//! [`LifecycleReporter`]. The [`embedded`] module provides an in-process
//! runtime for applications that do not bring their own.
//!
//! ```rust
//! use lattice::embedded::{ComponentDefinition, EmbeddedProvider};
//! use lattice::{ContainerController, ScopeId};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = EmbeddedProvider::new().with_component(ComponentDefinition::new(
//!     "greeting",
//!     ScopeId::Request,
//!     |_| Ok(String::from("hello")),
//! ));
//! let controller = ContainerController::standalone(provider);
//!
//! controller.boot_container()?;
//! controller.start_context(&ScopeId::Request)?;
//! if let Some(registry) = controller.component_registry() {
//!     assert_eq!(registry.resolve::<String>("greeting")?.as_str(), "hello");
//! }
//! controller.stop_context(&ScopeId::Request)?;
//! controller.shutdown_container()?;
//! # Ok(())
//! # }
//! ```

mod bootstrap;
mod controller;
pub mod embedded;
mod errors;
mod health;
mod runtime;
mod scope;
mod state;
mod telemetry;

pub use bootstrap::{
    BootstrapError, ConfigLoader, StaticConfigLoader, SystemConfigLoader, bootstrap, bootstrap_with,
};
pub use controller::{ContainerController, RegistryOf, ScopeGuard};
pub use errors::{
    CleanupAggregateError, CleanupFailure, ComponentError, ContainerError, DeploymentError,
    IllegalStateError, RuntimeFault, UnsupportedScopeError, WiringProblem,
};
pub use health::{LifecycleReporter, StructuredLifecycleReporter};
pub use runtime::{InjectionRuntime, RuntimeProvider};
pub use scope::{ScopeId, ScopeParseError};
pub use state::{ContainerState, Operation};
pub use telemetry::{TelemetryError, TelemetryHandle, initialise as initialise_telemetry};

#[cfg(test)]
mod tests;
