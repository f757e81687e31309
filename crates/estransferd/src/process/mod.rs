//! Daemon process supervision: pid-file singleton enforcement, standard
//! stream redirection, shutdown signalling, and the launch sequence tying
//! them together.

mod errors;
mod guard;
mod launch;
mod redirect;
mod shutdown;

pub use errors::LaunchError;
pub use guard::{GuardError, PidFileGuard};
pub use launch::{LaunchPlan, run_daemon, run_daemon_with};
pub use redirect::{RedirectError, redirect_output};
pub use shutdown::{
    ChannelShutdownSignal, ShutdownError, ShutdownHandle, ShutdownSignal, SystemShutdownSignal,
};

#[cfg(test)]
pub(crate) use shutdown::MockShutdownSignal;

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
