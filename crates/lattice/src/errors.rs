//! Error taxonomy for container lifecycle operations.
//!
//! Boot failures carry every wiring problem found rather than the first one,
//! and cleanup failures are collected across all destroyed instances so a
//! single broken component cannot hide the others.

use thiserror::Error;

use crate::scope::ScopeId;
use crate::state::{ContainerState, Operation};

/// Boxed error reported by component factories and destruction callbacks.
pub type ComponentError = Box<dyn std::error::Error + Send + Sync>;

/// A single defect found while validating component wiring.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WiringProblem {
    /// Two definitions share a name.
    #[error("component '{name}' is defined more than once")]
    DuplicateComponent {
        /// Name registered twice.
        name: String,
    },
    /// A component is bound to a scope the runtime does not manage.
    #[error("component '{component}' is bound to unsupported scope '{scope}'")]
    UnsupportedScope {
        /// Offending component.
        component: String,
        /// Scope it was bound to.
        scope: ScopeId,
    },
    /// A component depends on a name nothing provides.
    #[error("component '{component}' depends on unknown component '{dependency}'")]
    MissingDependency {
        /// Component declaring the dependency.
        component: String,
        /// Name that could not be found.
        dependency: String,
    },
    /// A component depends on one that lives in a shorter-lived scope.
    #[error(
        "component '{component}' in {scope} scope cannot depend on '{dependency}' in {dependency_scope} scope"
    )]
    ScopeWidening {
        /// Component declaring the dependency.
        component: String,
        /// Scope of the declaring component.
        scope: ScopeId,
        /// Shorter-lived dependency.
        dependency: String,
        /// Scope of the dependency.
        dependency_scope: ScopeId,
    },
    /// Declared dependencies form a cycle.
    #[error("dependency cycle: {}", .path.join(" -> "))]
    DependencyCycle {
        /// Component names along the cycle, first name repeated at the end.
        path: Vec<String>,
    },
}

/// Raised when discovery or wiring fails during boot. Fatal to that attempt.
#[derive(Debug, Error)]
#[error("{message}{}", render_problems(.problems))]
pub struct DeploymentError {
    message: String,
    problems: Vec<WiringProblem>,
    #[source]
    source: Option<ComponentError>,
}

impl DeploymentError {
    /// Builds an error without an underlying source.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            problems: Vec::new(),
            source: None,
        }
    }

    /// Builds an error that wraps an underlying source.
    #[must_use]
    pub fn with_source(message: impl Into<String>, source: impl Into<ComponentError>) -> Self {
        Self {
            message: message.into(),
            problems: Vec::new(),
            source: Some(source.into()),
        }
    }

    /// Builds an error listing every wiring problem found.
    #[must_use]
    pub fn invalid_wiring(problems: Vec<WiringProblem>) -> Self {
        Self {
            message: String::from("invalid component wiring"),
            problems,
            source: None,
        }
    }

    /// Human-readable summary of the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Wiring problems found during validation.
    #[must_use]
    pub fn problems(&self) -> &[WiringProblem] {
        &self.problems
    }
}

fn render_problems(problems: &[WiringProblem]) -> String {
    problems
        .iter()
        .map(|problem| format!("; {problem}"))
        .collect()
}

/// An operation was invoked outside the states where it is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {operation} while the container is {state}")]
pub struct IllegalStateError {
    /// Operation that was attempted.
    pub operation: Operation,
    /// State the controller was in.
    pub state: ContainerState,
}

/// A scope argument is not managed natively by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("scope '{scope}' is not managed by the runtime (supported: {})", render_scopes(.supported))]
pub struct UnsupportedScopeError {
    /// Scope that was requested.
    pub scope: ScopeId,
    /// Scopes the runtime does manage.
    pub supported: Vec<ScopeId>,
}

fn render_scopes(scopes: &[ScopeId]) -> String {
    if scopes.is_empty() {
        return String::from("none");
    }
    scopes
        .iter()
        .map(ScopeId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// One destruction callback that failed.
#[derive(Debug, Error)]
#[error("component '{component}' in {scope} scope: {source}")]
pub struct CleanupFailure {
    /// Scope the instance belonged to.
    pub scope: ScopeId,
    /// Name of the component whose callback failed.
    pub component: String,
    /// Error reported by the callback.
    #[source]
    pub source: ComponentError,
}

/// One or more destruction callbacks failed while stopping scopes.
///
/// Every instance was still released; the list names exactly the components
/// whose callbacks failed.
#[derive(Debug, Default, Error)]
#[error("{} component(s) failed during cleanup: {}", .failures.len(), render_failures(.failures))]
pub struct CleanupAggregateError {
    failures: Vec<CleanupFailure>,
}

impl CleanupAggregateError {
    /// Builds an aggregate from collected failures.
    #[must_use]
    pub const fn new(failures: Vec<CleanupFailure>) -> Self {
        Self { failures }
    }

    /// Records another failure.
    pub fn push(&mut self, failure: CleanupFailure) {
        self.failures.push(failure);
    }

    /// Appends the failures from another aggregate.
    pub fn absorb(&mut self, other: Self) {
        self.failures.extend(other.failures);
    }

    /// Returns the collected failures.
    #[must_use]
    pub fn failures(&self) -> &[CleanupFailure] {
        &self.failures
    }

    /// Returns `true` when no failure was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Converts an empty aggregate into `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one failure was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

fn render_failures(failures: &[CleanupFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// The runtime failed to release its resources.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RuntimeFault {
    message: String,
    #[source]
    source: Option<ComponentError>,
}

impl RuntimeFault {
    /// Builds a fault without an underlying source.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a fault that wraps an underlying source.
    #[must_use]
    pub fn with_source(message: impl Into<String>, source: impl Into<ComponentError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Human-readable message describing the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// Errors returned by [`crate::ContainerController`] operations.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Boot failed; the controller remains unbooted.
    #[error("container deployment failed: {0}")]
    Deployment(#[from] DeploymentError),
    /// The operation is not valid in the current state.
    #[error(transparent)]
    IllegalState(#[from] IllegalStateError),
    /// The scope is not managed by the runtime.
    #[error(transparent)]
    UnsupportedScope(#[from] UnsupportedScopeError),
    /// Destruction callbacks failed while stopping scopes.
    #[error(transparent)]
    Cleanup(#[from] CleanupAggregateError),
    /// The runtime reported a failure while shutting down.
    ///
    /// Destruction failures collected before the runtime was released travel
    /// with the fault.
    #[error("container shutdown failed: {fault}{}", render_cleanup(.cleanup.as_ref()))]
    Shutdown {
        /// Failure reported by the runtime itself.
        #[source]
        fault: RuntimeFault,
        /// Scope cleanup failures that preceded the fault.
        cleanup: Option<CleanupAggregateError>,
    },
    /// The deployment mode hands lifecycle control to the host.
    #[error("cannot {operation}: the container is managed by its host")]
    HostManaged {
        /// Operation that was refused.
        operation: Operation,
    },
}

impl ContainerError {
    /// Returns the cleanup report when the error came from stopping scopes.
    #[must_use]
    pub const fn cleanup(&self) -> Option<&CleanupAggregateError> {
        match self {
            Self::Cleanup(aggregate)
            | Self::Shutdown {
                cleanup: Some(aggregate),
                ..
            } => Some(aggregate),
            _ => None,
        }
    }
}

impl From<RuntimeFault> for ContainerError {
    fn from(fault: RuntimeFault) -> Self {
        Self::Shutdown {
            fault,
            cleanup: None,
        }
    }
}

fn render_cleanup(cleanup: Option<&CleanupAggregateError>) -> String {
    cleanup.map_or_else(String::new, |aggregate| format!(" (after cleanup: {aggregate})"))
}
