//! Component definitions and wiring validation.

use std::any::{Any, type_name};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::errors::{ComponentError, DeploymentError, WiringProblem};
use crate::scope::ScopeId;

use super::registry::Resolver;

/// Type-erased instance held in scope storage.
pub(crate) type Instance = Arc<dyn Any + Send + Sync>;

type Factory = Arc<dyn Fn(&Resolver<'_>) -> Result<Instance, ComponentError> + Send + Sync>;
type Destructor = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> Result<(), ComponentError> + Send + Sync>;

/// Describes how to create and destroy one named component.
///
/// # Example
///
/// ```rust
/// use lattice::ScopeId;
/// use lattice::embedded::ComponentDefinition;
///
/// struct Connection;
///
/// impl Connection {
///     fn close(&self) -> Result<(), std::io::Error> {
///         Ok(())
///     }
/// }
///
/// let definition = ComponentDefinition::new("connection", ScopeId::Request, |_| Ok(Connection))
///     .on_destroy(|connection: &Connection| connection.close().map_err(Into::into));
/// assert_eq!(definition.name(), "connection");
/// ```
#[derive(Clone)]
pub struct ComponentDefinition {
    name: String,
    scope: ScopeId,
    dependencies: Vec<String>,
    type_name: &'static str,
    factory: Factory,
    destructor: Option<Destructor>,
}

impl ComponentDefinition {
    /// Defines a component created by `factory` inside `scope`.
    pub fn new<T, F>(name: impl Into<String>, scope: ScopeId, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver<'_>) -> Result<T, ComponentError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            scope,
            dependencies: Vec::new(),
            type_name: type_name::<T>(),
            factory: Arc::new(move |resolver| {
                factory(resolver).map(|value| Arc::new(value) as Instance)
            }),
            destructor: None,
        }
    }

    /// Declares components the factory may resolve.
    #[must_use]
    pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies
            .extend(dependencies.into_iter().map(Into::into));
        self
    }

    /// Registers a callback run when the owning scope destroys the instance.
    #[must_use]
    pub fn on_destroy<T, D>(mut self, destroy: D) -> Self
    where
        T: Send + Sync + 'static,
        D: Fn(&T) -> Result<(), ComponentError> + Send + Sync + 'static,
    {
        let expected = type_name::<T>();
        self.destructor = Some(Arc::new(move |instance: &(dyn Any + Send + Sync)| {
            instance.downcast_ref::<T>().map_or_else(
                || Err(format!("destruction callback expects a {expected}").into()),
                &destroy,
            )
        }));
        self
    }

    /// Component name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Scope the component lives in.
    #[must_use]
    pub const fn scope(&self) -> &ScopeId {
        &self.scope
    }

    /// Declared dependencies.
    #[must_use]
    pub const fn dependencies(&self) -> &[String] {
        self.dependencies.as_slice()
    }

    /// Rust type produced by the factory.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn create(&self, resolver: &Resolver<'_>) -> Result<Instance, ComponentError> {
        (self.factory)(resolver)
    }

    pub(crate) fn destroy(&self, instance: &Instance) -> Result<(), ComponentError> {
        self.destructor
            .as_ref()
            .map_or(Ok(()), |destructor| destructor(instance.as_ref()))
    }
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("dependencies", &self.dependencies)
            .field("type_name", &self.type_name)
            .field("destructor", &self.destructor.is_some())
            .finish_non_exhaustive()
    }
}

/// Definitions gathered during discovery, validated as a whole at boot.
#[derive(Debug, Clone, Default)]
pub struct ComponentCatalog {
    definitions: Vec<ComponentDefinition>,
}

impl ComponentCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a definition. Duplicates are reported during validation.
    pub fn register(&mut self, definition: ComponentDefinition) -> &mut Self {
        self.definitions.push(definition);
        self
    }

    /// Number of registered definitions.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns `true` when nothing has been registered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Iterates over registered definitions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentDefinition> {
        self.definitions.iter()
    }

    /// Checks the wiring and indexes definitions by name.
    pub(crate) fn validate(
        self,
        native: &[ScopeId],
    ) -> Result<HashMap<String, ComponentDefinition>, DeploymentError> {
        let mut problems = Vec::new();
        let mut index: HashMap<String, ComponentDefinition> = HashMap::new();
        let mut duplicates = HashSet::new();

        for definition in self.definitions {
            if index.contains_key(definition.name()) {
                if duplicates.insert(definition.name.clone()) {
                    problems.push(WiringProblem::DuplicateComponent {
                        name: definition.name.clone(),
                    });
                }
                continue;
            }
            if !native.contains(definition.scope()) {
                problems.push(WiringProblem::UnsupportedScope {
                    component: definition.name.clone(),
                    scope: definition.scope.clone(),
                });
            }
            index.insert(definition.name.clone(), definition);
        }

        let mut names: Vec<&String> = index.keys().collect();
        names.sort();
        for name in &names {
            let Some(definition) = index.get(*name) else {
                continue;
            };
            for dependency in definition.dependencies() {
                match index.get(dependency) {
                    None => problems.push(WiringProblem::MissingDependency {
                        component: definition.name.clone(),
                        dependency: dependency.clone(),
                    }),
                    Some(target) if !may_depend_on(definition.scope(), target.scope()) => {
                        problems.push(WiringProblem::ScopeWidening {
                            component: definition.name.clone(),
                            scope: definition.scope.clone(),
                            dependency: dependency.clone(),
                            dependency_scope: target.scope.clone(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        problems.extend(
            find_cycles(&index)
                .into_iter()
                .map(|path| WiringProblem::DependencyCycle { path }),
        );

        if problems.is_empty() {
            Ok(index)
        } else {
            Err(DeploymentError::invalid_wiring(problems))
        }
    }
}

/// Relative lifetime of built-in scopes; longer-lived scopes rank lower.
const fn lifetime_rank(scope: &ScopeId) -> Option<u8> {
    match scope {
        ScopeId::Application => Some(0),
        ScopeId::Session => Some(1),
        ScopeId::Conversation => Some(2),
        ScopeId::Request => Some(3),
        ScopeId::Custom(_) => None,
    }
}

/// A component may only hold instances that live at least as long as itself.
fn may_depend_on(component: &ScopeId, dependency: &ScopeId) -> bool {
    if component == dependency || *dependency == ScopeId::Application {
        return true;
    }
    match (lifetime_rank(component), lifetime_rank(dependency)) {
        (Some(owner), Some(target)) => target <= owner,
        _ => false,
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

fn find_cycles(index: &HashMap<String, ComponentDefinition>) -> Vec<Vec<String>> {
    let graph: BTreeMap<&str, Vec<&str>> = index
        .values()
        .map(|definition| {
            let edges = definition
                .dependencies()
                .iter()
                .map(String::as_str)
                .filter(|dependency| index.contains_key(*dependency))
                .collect();
            (definition.name(), edges)
        })
        .collect();

    let mut marks = HashMap::new();
    let mut stack = Vec::new();
    let mut cycles = Vec::new();
    for &node in graph.keys() {
        visit(node, &graph, &mut marks, &mut stack, &mut cycles);
    }
    cycles
}

fn visit<'a>(
    node: &'a str,
    graph: &BTreeMap<&'a str, Vec<&'a str>>,
    marks: &mut HashMap<&'a str, Mark>,
    stack: &mut Vec<&'a str>,
    cycles: &mut Vec<Vec<String>>,
) {
    match marks.get(node) {
        Some(Mark::Done) => return,
        Some(Mark::Visiting) => {
            let start = stack
                .iter()
                .position(|candidate| *candidate == node)
                .unwrap_or_default();
            let mut path: Vec<String> = stack
                .iter()
                .skip(start)
                .map(|name| (*name).to_owned())
                .collect();
            path.push(node.to_owned());
            cycles.push(path);
            return;
        }
        None => {}
    }

    marks.insert(node, Mark::Visiting);
    stack.push(node);
    if let Some(edges) = graph.get(node) {
        for &dependency in edges {
            visit(dependency, graph, marks, stack, cycles);
        }
    }
    stack.pop();
    marks.insert(node, Mark::Done);
}
