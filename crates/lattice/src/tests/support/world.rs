//! BDD test world: owns the loader, reporter, embedded provider and
//! controller state for step functions.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex};

use lattice_config::DeploymentMode;

use crate::bootstrap::{BootstrapError, ConfigLoader, bootstrap_with};
use crate::controller::ContainerController;
use crate::embedded::{ComponentDefinition, ComponentRegistry, EmbeddedProvider, ResolveError};
use crate::errors::ContainerError;
use crate::scope::ScopeId;

use super::config_loader::{FailingConfigLoader, TestConfigLoader};
use super::reporter::RecordingLifecycleReporter;

/// Instance produced by every scenario component.
#[derive(Debug)]
pub struct Tracked {
    /// Component name.
    pub name: String,
}

#[derive(Default)]
struct Cleanup {
    destroyed: Vec<String>,
    failing: HashSet<String>,
}

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    loader: Box<dyn ConfigLoader>,
    /// Reporter shared with the controller.
    pub reporter: Arc<RecordingLifecycleReporter>,
    cleanup: Arc<Mutex<Cleanup>>,
    controller: Option<ContainerController<EmbeddedProvider>>,
    bootstrap_error: Option<BootstrapError>,
    last_result: Option<Result<(), ContainerError>>,
    previous_registry: Option<ComponentRegistry>,
    resolved: HashMap<String, Arc<Tracked>>,
}

impl TestWorld {
    /// Builds a world with a successful standalone configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self {
            loader: Box::new(TestConfigLoader::new()),
            reporter: Arc::new(RecordingLifecycleReporter::default()),
            cleanup: Arc::new(Mutex::new(Cleanup::default())),
            controller: None,
            bootstrap_error: None,
            last_result: None,
            previous_registry: None,
            resolved: HashMap::new(),
        }
    }

    /// Installs a loader that always fails.
    pub fn use_failing_loader(&mut self) {
        self.loader = Box::new(FailingConfigLoader);
    }

    /// Installs a loader for a host-managed deployment.
    pub fn use_managed_loader(&mut self) {
        self.loader = Box::new(TestConfigLoader::with_mode(DeploymentMode::Managed));
    }

    /// Makes the named component's destruction callback fail.
    pub fn fail_cleanup_of(&self, name: &str) {
        self.lock_cleanup().failing.insert(name.to_owned());
    }

    /// Runs the bootstrap sequence once.
    pub fn bootstrap(&mut self) {
        if self.controller.is_some() || self.bootstrap_error.is_some() {
            return;
        }
        let provider = self.provider();
        match bootstrap_with(&*self.loader, self.reporter.clone(), provider) {
            Ok(controller) => self.controller = Some(controller),
            Err(error) => self.bootstrap_error = Some(error),
        }
    }

    /// Returns the bootstrap error, if any.
    #[must_use]
    pub const fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    /// Returns the controller built by bootstrap.
    ///
    /// # Errors
    ///
    /// Fails when bootstrap has not produced a controller.
    pub fn controller(&self) -> Result<&ContainerController<EmbeddedProvider>, String> {
        self.controller
            .as_ref()
            .ok_or_else(|| String::from("controller was not bootstrapped"))
    }

    /// Runs a controller operation and records its result.
    ///
    /// # Errors
    ///
    /// Fails when bootstrap has not produced a controller.
    pub fn run<F>(&mut self, operation: F) -> Result<(), String>
    where
        F: FnOnce(&ContainerController<EmbeddedProvider>) -> Result<(), ContainerError>,
    {
        let result = operation(self.controller()?);
        self.last_result = Some(result);
        Ok(())
    }

    /// Returns the result of the last controller operation.
    #[must_use]
    pub const fn last_result(&self) -> Option<&Result<(), ContainerError>> {
        self.last_result.as_ref()
    }

    /// Keeps the current registry so later steps can inspect it after a
    /// shutdown.
    ///
    /// # Errors
    ///
    /// Fails when no registry is available.
    pub fn remember_registry(&mut self) -> Result<(), String> {
        let registry = self
            .controller()?
            .component_registry()
            .ok_or_else(|| String::from("registry unavailable"))?;
        self.previous_registry = Some(registry);
        Ok(())
    }

    /// Registry captured by [`Self::remember_registry`].
    #[must_use]
    pub const fn previous_registry(&self) -> Option<&ComponentRegistry> {
        self.previous_registry.as_ref()
    }

    /// Resolves a component through the live registry.
    ///
    /// # Errors
    ///
    /// Fails when the controller has no registry.
    pub fn resolve(&self, name: &str) -> Result<Result<Arc<Tracked>, ResolveError>, String> {
        let registry = self
            .controller()?
            .component_registry()
            .ok_or_else(|| String::from("registry unavailable"))?;
        Ok(registry.resolve::<Tracked>(name))
    }

    /// Resolves a component and remembers the instance.
    ///
    /// # Errors
    ///
    /// Fails when resolution fails.
    pub fn resolve_and_remember(&mut self, name: &str) -> Result<(), String> {
        let instance = self
            .resolve(name)?
            .map_err(|error| format!("failed to resolve '{name}': {error}"))?;
        self.resolved.insert(name.to_owned(), instance);
        Ok(())
    }

    /// Instance remembered for `name`.
    #[must_use]
    pub fn remembered(&self, name: &str) -> Option<&Arc<Tracked>> {
        self.resolved.get(name)
    }

    /// Component names whose destruction callbacks ran, in order.
    #[must_use]
    pub fn destroyed(&self) -> Vec<String> {
        self.lock_cleanup().destroyed.clone()
    }

    fn provider(&self) -> EmbeddedProvider {
        [
            ("config", ScopeId::Application),
            ("cart", ScopeId::Session),
            ("wizard", ScopeId::Conversation),
            ("connection", ScopeId::Request),
            ("transaction", ScopeId::Request),
            ("audit", ScopeId::Request),
        ]
        .into_iter()
        .fold(EmbeddedProvider::new(), |provider, (name, scope)| {
            provider.with_component(self.component(name, scope))
        })
    }

    fn component(&self, name: &'static str, scope: ScopeId) -> ComponentDefinition {
        let cleanup = Arc::clone(&self.cleanup);
        ComponentDefinition::new(name, scope, move |_| {
            Ok(Tracked {
                name: name.to_owned(),
            })
        })
        .on_destroy(move |instance: &Tracked| {
            let mut state = cleanup.lock().expect("cleanup mutex poisoned");
            state.destroyed.push(instance.name.clone());
            if state.failing.contains(&instance.name) {
                return Err(io::Error::other("connection reset while flushing").into());
            }
            Ok(())
        })
    }

    fn lock_cleanup(&self) -> std::sync::MutexGuard<'_, Cleanup> {
        self.cleanup.lock().expect("cleanup mutex poisoned")
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Default test world fixture.
#[must_use]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
