//! Deployment modes for the container controller.
//!
//! A standalone process owns its container outright and drives boot and
//! shutdown itself. A managed deployment runs inside a host that already
//! controls the container, so the controller must not boot or shut it down.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Who owns the container lifecycle.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DeploymentMode {
    /// The process boots and shuts down the container itself.
    #[default]
    Standalone,
    /// A hosting environment controls the container.
    Managed,
}

impl DeploymentMode {
    /// Returns `true` when the controller may boot and shut down the container.
    #[must_use]
    pub const fn owns_container(self) -> bool {
        matches!(self, Self::Standalone)
    }
}

/// Errors encountered while parsing a [`DeploymentMode`] from text.
pub type DeploymentModeParseError = strum::ParseError;
