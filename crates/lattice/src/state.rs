//! Observable controller states and the operations that move between them.

use std::fmt;

/// Lifecycle state of a [`crate::ContainerController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerState {
    /// No runtime handle exists. Initial and terminal state.
    Unbooted,
    /// The runtime is booted and no scope is active.
    Booted,
    /// The runtime is booted and at least one scope is active.
    ContextsActive,
}

impl ContainerState {
    /// Returns `true` when a runtime handle is live.
    #[must_use]
    pub const fn is_booted(self) -> bool {
        !matches!(self, Self::Unbooted)
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unbooted => "unbooted",
            Self::Booted => "booted",
            Self::ContextsActive => "contexts-active",
        };
        formatter.write_str(label)
    }
}

/// Lifecycle operations exposed by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Boot the container.
    Boot,
    /// Shut the container down.
    Shutdown,
    /// Start every native scope.
    StartContexts,
    /// Stop every active scope.
    StopContexts,
    /// Start a single scope.
    StartContext,
    /// Stop a single scope.
    StopContext,
}

impl fmt::Display for Operation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Boot => "boot",
            Self::Shutdown => "shutdown",
            Self::StartContexts => "start contexts",
            Self::StopContexts => "stop contexts",
            Self::StartContext => "start context",
            Self::StopContext => "stop context",
        };
        formatter.write_str(label)
    }
}
