//! Unified error surface for daemon launch and supervision.

use thiserror::Error;

use crate::telemetry::TelemetryError;

use super::guard::GuardError;
use super::redirect::RedirectError;
use super::shutdown::ShutdownError;

/// Errors surfaced while launching or supervising the daemon process.
///
/// Every variant is a startup- or lifecycle-fatal condition; the binary maps
/// any of them to exit code 1. None are retried: never running two instances
/// and never losing prior output take precedence over availability.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Configuring the logging subsystem failed.
    #[error("failed to configure logging: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[from]
        source: TelemetryError,
    },
    /// The pid file could not be acquired.
    #[error("failed to acquire pid file: {source}")]
    Guard {
        /// Underlying guard error.
        #[from]
        source: GuardError,
    },
    /// Redirecting the standard streams failed.
    #[error("failed to redirect output: {source}")]
    Redirect {
        /// Underlying redirect error.
        #[from]
        source: RedirectError,
    },
    /// Waiting for shutdown failed.
    #[error("failed to await shutdown signal: {source}")]
    Shutdown {
        /// Underlying shutdown error.
        #[from]
        source: ShutdownError,
    },
}
