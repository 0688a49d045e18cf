//! Lookup surface handed out while the embedded runtime is booted.

use std::any::type_name;
use std::sync::{Arc, Weak};

use thiserror::Error;

use crate::errors::ComponentError;
use crate::scope::ScopeId;

use super::catalog::{ComponentDefinition, Instance};
use super::runtime::RuntimeState;
use super::storage::run_destructor;

const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// Errors raised while resolving a component.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The runtime behind this registry has been shut down.
    #[error("the container has shut down")]
    ContainerShutDown,
    /// No component is registered under the name.
    #[error("unknown component '{name}'")]
    UnknownComponent {
        /// Requested name.
        name: String,
    },
    /// The component's scope is not currently active.
    #[error("cannot resolve '{name}': {scope} scope is not active")]
    ScopeInactive {
        /// Requested name.
        name: String,
        /// Scope the component lives in.
        scope: ScopeId,
    },
    /// A factory asked for something it did not declare.
    #[error("component '{component}' did not declare a dependency on '{dependency}'")]
    UndeclaredDependency {
        /// Component whose factory was running.
        component: String,
        /// Name it tried to resolve.
        dependency: String,
    },
    /// The factory returned an error.
    #[error("factory for '{name}' failed: {source}")]
    Factory {
        /// Component being created.
        name: String,
        /// Error returned by the factory.
        #[source]
        source: ComponentError,
    },
    /// The instance is not of the requested type.
    #[error("component '{name}' is a {actual}, not a {expected}")]
    TypeMismatch {
        /// Requested name.
        name: String,
        /// Type the caller asked for.
        expected: &'static str,
        /// Type the factory produces.
        actual: &'static str,
    },
}

/// Handle for looking up components in active scopes.
///
/// The registry does not keep the runtime alive. Once the container shuts
/// down every lookup fails with [`ResolveError::ContainerShutDown`].
#[derive(Debug, Clone)]
pub struct ComponentRegistry {
    state: Weak<RuntimeState>,
}

impl ComponentRegistry {
    pub(crate) fn new(state: &Arc<RuntimeState>) -> Self {
        Self {
            state: Arc::downgrade(state),
        }
    }

    /// Returns the instance of `name` in its active scope, creating it on
    /// first use.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the container has shut down, the name is
    /// unknown, its scope is inactive, the factory fails, or `T` is not the
    /// component's type.
    pub fn resolve<T>(&self, name: &str) -> Result<Arc<T>, ResolveError>
    where
        T: Send + Sync + 'static,
    {
        let state = self.upgrade()?;
        let (instance, definition) = state.resolve_instance(name)?;
        downcast(instance, definition)
    }

    /// Returns `true` while the runtime behind this registry is booted.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.state.strong_count() > 0
    }

    /// Returns `true` when a component named `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.state
            .upgrade()
            .is_some_and(|state| state.definition(name).is_some())
    }

    /// Registered component names in sorted order.
    #[must_use]
    pub fn component_names(&self) -> Vec<String> {
        self.state
            .upgrade()
            .map(|state| state.component_names())
            .unwrap_or_default()
    }

    /// Scope the named component lives in.
    #[must_use]
    pub fn scope_of(&self, name: &str) -> Option<ScopeId> {
        self.state
            .upgrade()
            .and_then(|state| state.definition(name).map(|found| found.scope().clone()))
    }

    /// Returns `true` when `scope` is currently active.
    #[must_use]
    pub fn is_scope_active(&self, scope: &ScopeId) -> bool {
        self.state
            .upgrade()
            .is_some_and(|state| state.is_active(scope))
    }

    /// Number of instances currently held by `scope`.
    #[must_use]
    pub fn instance_count(&self, scope: &ScopeId) -> usize {
        self.state
            .upgrade()
            .map_or(0, |state| state.instance_count(scope))
    }

    fn upgrade(&self) -> Result<Arc<RuntimeState>, ResolveError> {
        self.state.upgrade().ok_or(ResolveError::ContainerShutDown)
    }
}

/// Restricted lookup passed to component factories.
///
/// Factories may only resolve the dependencies they declared.
pub struct Resolver<'a> {
    state: &'a RuntimeState,
    component: &'a ComponentDefinition,
}

impl<'a> Resolver<'a> {
    pub(crate) const fn new(state: &'a RuntimeState, component: &'a ComponentDefinition) -> Self {
        Self { state, component }
    }

    /// Name of the component being created.
    #[must_use]
    pub fn component(&self) -> &str {
        self.component.name()
    }

    /// Resolves a declared dependency.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UndeclaredDependency`] for names missing from
    /// the component's declaration, otherwise as
    /// [`ComponentRegistry::resolve`].
    pub fn resolve<T>(&self, name: &str) -> Result<Arc<T>, ResolveError>
    where
        T: Send + Sync + 'static,
    {
        let declared = self
            .component
            .dependencies()
            .iter()
            .any(|dependency| dependency == name);
        if !declared {
            return Err(ResolveError::UndeclaredDependency {
                component: self.component.name().to_owned(),
                dependency: name.to_owned(),
            });
        }
        let (instance, definition) = self.state.resolve_instance(name)?;
        downcast(instance, definition)
    }
}

impl std::fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("component", &self.component.name())
            .finish_non_exhaustive()
    }
}

fn downcast<T>(instance: Instance, definition: &ComponentDefinition) -> Result<Arc<T>, ResolveError>
where
    T: Send + Sync + 'static,
{
    instance
        .downcast::<T>()
        .map_err(|_| ResolveError::TypeMismatch {
            name: definition.name().to_owned(),
            expected: type_name::<T>(),
            actual: definition.type_name(),
        })
}

impl RuntimeState {
    /// Finds or creates the instance for `name`.
    ///
    /// Factories run without the scope lock held. When two callers race to
    /// create the same instance, the later one is destroyed and the stored
    /// one returned.
    pub(crate) fn resolve_instance(
        &self,
        name: &str,
    ) -> Result<(Instance, &ComponentDefinition), ResolveError> {
        let definition = self
            .definition(name)
            .ok_or_else(|| ResolveError::UnknownComponent {
                name: name.to_owned(),
            })?;
        let scope = definition.scope();
        let inactive = || ResolveError::ScopeInactive {
            name: name.to_owned(),
            scope: scope.clone(),
        };

        {
            let scopes = self.lock_scopes();
            let store = scopes.get(scope).ok_or_else(inactive)?;
            if let Some(instance) = store.get(name) {
                return Ok((instance, definition));
            }
        }

        let created = definition
            .create(&Resolver::new(self, definition))
            .map_err(|source| ResolveError::Factory {
                name: name.to_owned(),
                source,
            })?;

        let mut scopes = self.lock_scopes();
        let Some(store) = scopes.get_mut(scope) else {
            drop(scopes);
            discard(definition, &created);
            return Err(inactive());
        };
        if let Some(existing) = store.get(name) {
            drop(scopes);
            discard(definition, &created);
            return Ok((existing, definition));
        }
        store.insert(name.to_owned(), Instance::clone(&created));
        tracing::trace!(
            target: REGISTRY_TARGET,
            component = name,
            scope = %scope,
            "instance created"
        );
        Ok((created, definition))
    }
}

fn discard(definition: &ComponentDefinition, instance: &Instance) {
    if let Err(error) = run_destructor(definition, instance) {
        tracing::warn!(
            target: REGISTRY_TARGET,
            component = definition.name(),
            error = %error,
            "failed to destroy discarded instance"
        );
    }
}
