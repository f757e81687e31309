//! Supervises the daemon lifecycle from startup through ordered teardown.
//!
//! The sequence runs exactly once per process invocation: build the context,
//! acquire the pid file, optionally redirect the standard streams, block on
//! the shutdown wait, then tear down in order. Failures return up the
//! ordinary call chain; only the binary's entry point turns the result into
//! an exit status.

use tracing::info;

use estransfer_config::Config;

use crate::context::ApplicationContext;
use crate::telemetry::component_span;
use crate::transfer;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::guard::PidFileGuard;
use super::redirect::redirect_output;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Collaborators required to run the daemon lifecycle.
pub struct LaunchPlan<S> {
    /// Validated application configuration.
    pub config: Config,
    /// Pre-configured context, or `None` to build one from the
    /// configuration's logging section.
    pub context: Option<ApplicationContext>,
    /// Shutdown notification source.
    pub shutdown: S,
}

/// Runs the daemon using the production collaborators, blocking until a
/// termination signal arrives.
pub fn run_daemon(config: Config) -> Result<(), LaunchError> {
    run_daemon_with(LaunchPlan {
        config,
        context: None,
        shutdown: SystemShutdownSignal::new(),
    })
}

/// Runs the daemon with injected collaborators.
pub fn run_daemon_with<S: ShutdownSignal>(plan: LaunchPlan<S>) -> Result<(), LaunchError> {
    let LaunchPlan {
        config,
        context,
        shutdown,
    } = plan;

    let context = match context {
        Some(existing) => existing,
        None => ApplicationContext::from_config(&config.logging)?,
    };

    let logger = context.logger.clone();
    logger.scope(|| {
        info!(target: PROCESS_TARGET, "started estransfer");

        let guard = PidFileGuard::acquire(config.general.pidfile.as_str())?;

        // Held for the rest of the run; dropping it would invalidate the
        // redirected streams.
        let _redirected = match config.general.stdout_logfile() {
            Some(path) => Some(redirect_output(path)?),
            None => None,
        };

        {
            let span = component_span("main", "estransfer");
            let _entered = span.enter();
            transfer::announce_ready();
            shutdown.wait()?;
            info!(target: PROCESS_TARGET, "shutdown triggered");
        }

        // Domain teardown goes here once the transfer pipeline exists.
        guard.release();
        info!(target: PROCESS_TARGET, "shutdown sequence completed");
        Ok(())
    })
}
