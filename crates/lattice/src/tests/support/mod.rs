//! Test harness utilities shared by the controller suites.

mod config_loader;
mod reporter;
mod runtime;
mod world;

pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use reporter::{LifecycleEvent, RecordingLifecycleReporter};
pub use runtime::{RecordingProvider, RecordingRegistry, RuntimeCall};
pub use world::{TestWorld, Tracked, world};
