//! Shutdown notification for the daemon's single blocking wait.

use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, PoisonError};

use signal_hook::consts::signal::{SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// Abstraction over shutdown notification mechanisms.
#[cfg_attr(test, mockall::automock)]
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until shutdown should proceed.
    fn wait(&self) -> Result<(), ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Shutdown listener that waits for the interrupt, quit, and terminate
/// signals. No other signals are intercepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemShutdownSignal;

impl SystemShutdownSignal {
    /// Builds the production signal listener.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let mut signals = Signals::new([SIGINT, SIGQUIT, SIGTERM])
            .map_err(|source| ShutdownError::Install { source })?;
        if let Some(signal) = signals.forever().next() {
            info!(
                target: PROCESS_TARGET,
                signal,
                "termination signal received"
            );
        }
        Ok(())
    }
}

/// Shutdown listener fed by an in-process channel, for embedders and tests
/// that deliver termination without a real OS signal.
#[derive(Debug)]
pub struct ChannelShutdownSignal {
    receiver: Mutex<Receiver<()>>,
}

impl ChannelShutdownSignal {
    /// Builds a channel listener and the handle that triggers it.
    #[must_use]
    pub fn new() -> (Self, ShutdownHandle) {
        let (sender, receiver) = mpsc::channel();
        (
            Self {
                receiver: Mutex::new(receiver),
            },
            ShutdownHandle { sender },
        )
    }
}

impl ShutdownSignal for ChannelShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let receiver = self.receiver.lock().unwrap_or_else(PoisonError::into_inner);
        // A dropped handle counts as a trigger; shutdown must never hang on a
        // channel nobody can send to anymore.
        let _ = receiver.recv();
        info!(
            target: PROCESS_TARGET,
            "termination requested via shutdown handle"
        );
        Ok(())
    }
}

/// Sends a termination request to a [`ChannelShutdownSignal`].
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Sender<()>,
}

impl ShutdownHandle {
    /// Requests shutdown; delivery is best-effort once the daemon is already
    /// past its wait.
    pub fn trigger(&self) {
        let _ = self.sender.send(());
    }
}
