//! Booted embedded runtime and its shared scope state.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::{CleanupAggregateError, RuntimeFault, UnsupportedScopeError};
use crate::runtime::InjectionRuntime;
use crate::scope::ScopeId;

use super::catalog::ComponentDefinition;
use super::registry::ComponentRegistry;
use super::storage::ScopeStore;

/// State shared between the runtime handle and the registries it hands out.
pub(crate) struct RuntimeState {
    definitions: HashMap<String, ComponentDefinition>,
    native: Vec<ScopeId>,
    scopes: Mutex<HashMap<ScopeId, ScopeStore>>,
}

impl RuntimeState {
    pub(crate) fn definition(&self, name: &str) -> Option<&ComponentDefinition> {
        self.definitions.get(name)
    }

    pub(crate) fn component_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.definitions.keys().cloned().collect();
        names.sort();
        names
    }

    pub(crate) fn is_active(&self, scope: &ScopeId) -> bool {
        self.lock_scopes().contains_key(scope)
    }

    pub(crate) fn instance_count(&self, scope: &ScopeId) -> usize {
        self.lock_scopes().get(scope).map_or(0, ScopeStore::len)
    }

    pub(crate) fn lock_scopes(&self) -> MutexGuard<'_, HashMap<ScopeId, ScopeStore>> {
        self.scopes
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

/// In-process runtime booted by [`super::EmbeddedProvider`].
pub struct EmbeddedRuntime {
    state: Arc<RuntimeState>,
}

impl EmbeddedRuntime {
    pub(crate) fn new(definitions: HashMap<String, ComponentDefinition>, native: Vec<ScopeId>) -> Self {
        Self {
            state: Arc::new(RuntimeState {
                definitions,
                native,
                scopes: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Number of registered components.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.state.definitions.len()
    }
}

impl fmt::Debug for EmbeddedRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedRuntime")
            .field("native", &self.state.native)
            .field("components", &self.state.component_names())
            .finish_non_exhaustive()
    }
}

impl InjectionRuntime for EmbeddedRuntime {
    type Registry = ComponentRegistry;

    fn native_scopes(&self) -> Vec<ScopeId> {
        self.state.native.clone()
    }

    fn supports(&self, scope: &ScopeId) -> bool {
        self.state.native.contains(scope)
    }

    fn activate_scope(&mut self, scope: &ScopeId) -> Result<(), UnsupportedScopeError> {
        if !self.supports(scope) {
            return Err(UnsupportedScopeError {
                scope: scope.clone(),
                supported: self.native_scopes(),
            });
        }
        self.state
            .lock_scopes()
            .entry(scope.clone())
            .or_default();
        Ok(())
    }

    fn deactivate_scope(&mut self, scope: &ScopeId) -> Result<(), CleanupAggregateError> {
        let removed = self.state.lock_scopes().remove(scope);
        removed.map_or(Ok(()), |store| {
            store
                .destroy(scope, &self.state.definitions)
                .into_result()
        })
    }

    fn registry(&self) -> Option<Self::Registry> {
        Some(ComponentRegistry::new(&self.state))
    }

    fn shutdown(self) -> Result<(), RuntimeFault> {
        let mut remaining: Vec<(ScopeId, ScopeStore)> =
            self.state.lock_scopes().drain().collect();
        remaining.sort_by_key(|(scope, _)| {
            self.state
                .native
                .iter()
                .position(|candidate| candidate == scope)
        });

        let mut failures = CleanupAggregateError::default();
        for (scope, store) in remaining.into_iter().rev() {
            failures.absorb(store.destroy(&scope, &self.state.definitions));
        }
        failures
            .into_result()
            .map_err(|aggregate| RuntimeFault::with_source("failed to release scoped instances", aggregate))
    }
}
