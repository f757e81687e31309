//! Process-wide aggregate shared by the daemon's components.

use estransfer_config::LoggingConfig;

use crate::telemetry::{self, LevelHandle, Logger, TelemetryError};

/// Objects used across the daemon, passed by reference in lieu of individual
/// arguments to every function.
#[derive(Clone, Debug)]
pub struct ApplicationContext {
    /// The configured logger. The lifecycle scopes it over the daemon run;
    /// derived component spans share its sink and severity handle.
    pub logger: Logger,

    /// Runtime-mutable severity threshold backing `logger`, exposed so an
    /// administrative surface can adjust verbosity without rebuilding the
    /// logging subsystem.
    pub log_level: LevelHandle,

    /// Set once the external configuration has been validated. The rest of
    /// the code does not consult it; the daemon refuses to start on an
    /// invalid configuration.
    pub configuration_valid: bool,
}

impl ApplicationContext {
    /// Wraps a pre-configured logger and severity handle.
    #[must_use]
    pub fn new(logger: Logger, log_level: LevelHandle) -> Self {
        Self {
            logger,
            log_level,
            configuration_valid: false,
        }
    }

    /// Builds a context with a freshly configured logging subsystem.
    pub fn from_config(config: &LoggingConfig) -> Result<Self, TelemetryError> {
        let (logger, log_level) = telemetry::configure(config)?.into_parts();
        Ok(Self {
            logger,
            log_level,
            configuration_valid: true,
        })
    }
}
