//! In-process injection runtime.
//!
//! [`EmbeddedProvider`] collects component definitions, either directly or
//! through [`ComponentModule`]s that are consulted on every boot, and
//! validates the wiring as a whole before handing out an
//! [`EmbeddedRuntime`]. Instances are created lazily on first lookup and
//! destroyed, newest first, when their scope stops.

mod catalog;
mod registry;
mod runtime;
mod storage;

use std::fmt;
use std::sync::Arc;

use lattice_config::Config;

use crate::errors::{ComponentError, DeploymentError};
use crate::runtime::RuntimeProvider;
use crate::scope::ScopeId;

pub use catalog::{ComponentCatalog, ComponentDefinition};
pub use registry::{ComponentRegistry, ResolveError, Resolver};
pub use runtime::EmbeddedRuntime;

const EMBEDDED_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::embedded");

/// Contributes component definitions during discovery.
pub trait ComponentModule: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Adds this module's definitions to `catalog`.
    ///
    /// # Errors
    ///
    /// Returns an error when the module cannot describe its components; boot
    /// then fails with a [`DeploymentError`].
    fn register(&self, catalog: &mut ComponentCatalog) -> Result<(), ComponentError>;
}

impl<T> ComponentModule for Arc<T>
where
    T: ComponentModule,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn register(&self, catalog: &mut ComponentCatalog) -> Result<(), ComponentError> {
        (**self).register(catalog)
    }
}

/// Boots [`EmbeddedRuntime`]s from registered definitions and modules.
#[derive(Clone)]
pub struct EmbeddedProvider {
    native: Vec<ScopeId>,
    definitions: Vec<ComponentDefinition>,
    modules: Vec<Arc<dyn ComponentModule>>,
}

impl EmbeddedProvider {
    /// Builds a provider managing the built-in scopes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            native: ScopeId::BUILT_IN.to_vec(),
            definitions: Vec::new(),
            modules: Vec::new(),
        }
    }

    /// Replaces the set of natively managed scopes.
    #[must_use]
    pub fn with_native_scopes<I>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = ScopeId>,
    {
        self.native = Vec::new();
        for scope in scopes {
            if !self.native.contains(&scope) {
                self.native.push(scope);
            }
        }
        self
    }

    /// Adds an extension scope after the existing ones.
    #[must_use]
    pub fn with_native_scope(mut self, scope: ScopeId) -> Self {
        if !self.native.contains(&scope) {
            self.native.push(scope);
        }
        self
    }

    /// Registers a single definition.
    #[must_use]
    pub fn with_component(mut self, definition: ComponentDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Registers a module consulted on every boot.
    #[must_use]
    pub fn with_module(mut self, module: impl ComponentModule + 'static) -> Self {
        self.modules.push(Arc::new(module));
        self
    }

    /// Scopes booted runtimes will manage.
    #[must_use]
    pub const fn native_scopes(&self) -> &[ScopeId] {
        self.native.as_slice()
    }

    fn discover(&self) -> Result<ComponentCatalog, DeploymentError> {
        let mut catalog = ComponentCatalog::new();
        for definition in &self.definitions {
            catalog.register(definition.clone());
        }
        for module in &self.modules {
            module.register(&mut catalog).map_err(|source| {
                DeploymentError::with_source(
                    format!("module '{}' failed to register components", module.name()),
                    source,
                )
            })?;
        }
        Ok(catalog)
    }
}

impl Default for EmbeddedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EmbeddedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedProvider")
            .field("native", &self.native)
            .field("definitions", &self.definitions)
            .field(
                "modules",
                &self.modules.iter().map(|module| module.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl RuntimeProvider for EmbeddedProvider {
    type Runtime = EmbeddedRuntime;

    fn boot(&self, _config: &Config) -> Result<Self::Runtime, DeploymentError> {
        let catalog = self.discover()?;
        tracing::debug!(
            target: EMBEDDED_TARGET,
            definitions = catalog.len(),
            modules = self.modules.len(),
            "validating component wiring"
        );
        let definitions = catalog.validate(&self.native)?;
        Ok(EmbeddedRuntime::new(definitions, self.native.clone()))
    }
}
