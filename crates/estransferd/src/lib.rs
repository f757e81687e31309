//! Lifecycle scaffold for the ESTransfer daemon.
//!
//! The crate owns the process lifecycle around the (stubbed) data-transfer
//! pipeline: pid-file singleton enforcement, signal-driven shutdown, optional
//! stdout/stderr redirection, and a structured, rotation-aware logging
//! subsystem whose severity threshold can be adjusted at runtime.
//!
//! Startup runs through [`run_daemon`]: the [`ApplicationContext`] (logger
//! plus level handle) is built from the logging configuration, the pid file
//! is acquired, the output streams are optionally redirected, and the daemon
//! then blocks on a [`ShutdownSignal`] until an interrupt, quit, or terminate
//! signal arrives. Teardown releases the pid file and returns an ordinary
//! [`Result`]; only `main` converts that into a process exit status.
//!
//! The logger is an explicitly constructed [`Logger`] carried in the context
//! and scoped over the lifecycle; nothing here mutates global subscriber
//! state.

mod context;
mod process;
mod telemetry;
mod transfer;

pub use context::ApplicationContext;
pub use process::{
    ChannelShutdownSignal, GuardError, LaunchError, LaunchPlan, PidFileGuard, RedirectError,
    ShutdownError, ShutdownHandle, ShutdownSignal, SystemShutdownSignal, redirect_output,
    run_daemon, run_daemon_with,
};
pub use telemetry::{LevelHandle, Logger, Telemetry, TelemetryError, component_span, configure};

#[cfg(test)]
mod tests;
