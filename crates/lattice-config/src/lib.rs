//! Shared configuration for the Lattice container controller.
//!
//! Values are layered by [`ortho_config`]: built-in defaults, then an optional
//! configuration file (`--config-path` or `LATTICE_CONFIG_PATH`), then
//! `LATTICE_*` environment variables, and finally command-line flags.

mod defaults;
mod logging;
mod mode;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, default_deployment_mode, default_log_filter, default_log_filter_string,
    default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use mode::{DeploymentMode, DeploymentModeParseError};

/// Resolved controller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "LATTICE")]
pub struct Config {
    /// `tracing` filter expression, e.g. `info` or `lattice=debug`.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Output format for log records.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
    /// Whether this process owns the container lifecycle.
    #[ortho_config(default = defaults::default_deployment_mode())]
    pub deployment_mode: DeploymentMode,
}

impl Config {
    /// Filter expression handed to the log subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Configured log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Configured deployment mode.
    #[must_use]
    pub const fn deployment_mode(&self) -> DeploymentMode {
        self.deployment_mode
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            deployment_mode: default_deployment_mode(),
        }
    }
}
