//! Configuration loaders for bootstrap success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};

use lattice_config::{Config, DeploymentMode, LogFormat};

use crate::bootstrap::ConfigLoader;

/// Loader returning a fixed configuration.
pub struct TestConfigLoader {
    config: Config,
}

impl TestConfigLoader {
    /// Standalone configuration with compact, quiet logging.
    #[must_use]
    pub fn new() -> Self {
        Self::with_mode(DeploymentMode::Standalone)
    }

    /// Configuration using the given deployment mode.
    #[must_use]
    pub fn with_mode(deployment_mode: DeploymentMode) -> Self {
        Self {
            config: Config {
                log_filter: String::from("warn"),
                log_format: LogFormat::Compact,
                deployment_mode,
            },
        }
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Loader that intentionally fails by passing an unknown log format.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("lattice"),
            OsString::from("--log-format"),
            OsString::from("yaml"),
        ];
        Config::load_from_iter(args)
    }
}
