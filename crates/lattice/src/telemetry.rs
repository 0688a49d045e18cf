//! Process-wide log output for hosts that run one or more controllers.
//!
//! Only the first bootstrap in a process installs the subscriber. Controllers
//! bootstrapped later share it whatever their own configuration says, and the
//! returned [`TelemetryHandle`] reports the settings actually in force.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::{EnvFilter, fmt};

use lattice_config::{Config, LogFormat};

const TELEMETRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::telemetry");

static INSTALLED: OnceCell<Installed> = OnceCell::new();

#[derive(Debug)]
struct Installed {
    filter: String,
    format: LogFormat,
}

/// Settings of the subscriber serving every controller in the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryHandle {
    filter: String,
    format: LogFormat,
    installed_now: bool,
}

impl TelemetryHandle {
    /// Filter directive in force.
    #[must_use]
    pub fn filter(&self) -> &str {
        self.filter.as_str()
    }

    /// Output format in force.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }

    /// Returns `true` when this call installed the subscriber.
    #[must_use]
    pub const fn installed_now(&self) -> bool {
        self.installed_now
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured filter directive does not parse.
    #[error("log filter '{filter}' is invalid: {reason}")]
    InvalidFilter {
        /// Directive as configured.
        filter: String,
        /// Parser diagnostic.
        reason: String,
    },
    /// Something other than lattice installed a global subscriber first.
    #[error("another tracing subscriber already owns this process: {0}")]
    ForeignSubscriber(#[source] SetGlobalDefaultError),
}

/// Installs the global subscriber on the first call in the process.
///
/// Later calls leave the subscriber alone and report the settings installed
/// by the first one, logging at debug level when `config` asked for something
/// different.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid or a subscriber
/// installed outside lattice is already in place.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    let mut installed_now = false;
    let installed = INSTALLED.get_or_try_init(|| {
        let subscriber = build_subscriber(config)?;
        tracing::subscriber::set_global_default(subscriber)
            .map_err(TelemetryError::ForeignSubscriber)?;
        installed_now = true;
        Ok::<_, TelemetryError>(Installed {
            filter: config.log_filter().to_owned(),
            format: config.log_format(),
        })
    })?;

    if !installed_now
        && (installed.filter != config.log_filter() || installed.format != config.log_format())
    {
        tracing::debug!(
            target: TELEMETRY_TARGET,
            requested_filter = config.log_filter(),
            requested_format = %config.log_format(),
            active_filter = installed.filter.as_str(),
            active_format = %installed.format,
            "telemetry already installed; keeping the existing settings"
        );
    }

    Ok(TelemetryHandle {
        filter: installed.filter.clone(),
        format: installed.format,
        installed_now,
    })
}

fn build_subscriber(config: &Config) -> Result<Box<dyn Subscriber + Send + Sync>, TelemetryError> {
    let filter = EnvFilter::try_new(config.log_filter()).map_err(|error| {
        TelemetryError::InvalidFilter {
            filter: config.log_filter().to_owned(),
            reason: error.to_string(),
        }
    })?;

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        // Lifecycle calls may arrive from any thread.
        .with_thread_names(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(fmt::time::UtcTime::rfc_3339());

    Ok(match config.log_format() {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    })
}
