//! Pid-file singleton enforcement.
//!
//! The pid file records the process id of the instance currently holding
//! exclusive run rights. Acquisition fails closed: an unreadable or corrupt
//! file refuses startup rather than risking a double-run, and only a probe
//! that positively reports "no such process" lets a stale file be replaced.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::num::ParseIntError;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use thiserror::Error;
use tracing::{info, warn};

use super::PROCESS_TARGET;

/// Errors surfaced while acquiring the pid file.
#[derive(Debug, Error)]
pub enum GuardError {
    /// The existing pid file could not be read.
    #[error("failed to read pid file '{path}': {source}")]
    Read {
        /// Pid file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The existing pid file did not contain a process id.
    #[error("pid file '{path}' does not contain a process id: {source}")]
    Corrupt {
        /// Pid file path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: ParseIntError,
    },
    /// Another live instance holds the pid file.
    #[error("another instance is already running with pid {pid}")]
    AlreadyRunning {
        /// Process id recorded in the existing pid file.
        pid: u32,
    },
    /// Probing the recorded process failed.
    #[error("failed to probe process {pid}: {source}")]
    Probe {
        /// Process id that failed to probe.
        pid: u32,
        /// Underlying OS error.
        source: Errno,
    },
    /// Writing the pid file failed.
    #[error("failed to write pid file '{path}': {source}")]
    Write {
        /// Pid file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Exclusive run rights backed by a pid file.
///
/// Dropping the guard (or calling [`PidFileGuard::release`]) deletes the
/// file; a failed deletion is logged but never fatal, as the process is
/// already exiting.
#[derive(Debug)]
pub struct PidFileGuard {
    path: PathBuf,
    released: bool,
}

impl PidFileGuard {
    /// Acquires the pid file at `path` for the current process.
    ///
    /// An absent file is created with this process's id. An existing file is
    /// honoured when its process is alive, tolerated when it already records
    /// this process (a container restart can hand the new instance the old
    /// pid), and replaced when the recorded process no longer exists.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, GuardError> {
        let path = path.into();
        let own_pid = std::process::id();
        match fs::read_to_string(&path) {
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                write_pid_file(&path, own_pid, true)?;
                info!(
                    target: PROCESS_TARGET,
                    pid = own_pid,
                    file = %path.display(),
                    "pid file written"
                );
            }
            Err(source) => return Err(GuardError::Read { path, source }),
            Ok(contents) => {
                let recorded =
                    contents
                        .trim()
                        .parse::<u32>()
                        .map_err(|source| GuardError::Corrupt {
                            path: path.clone(),
                            source,
                        })?;
                if recorded == own_pid {
                    info!(
                        target: PROCESS_TARGET,
                        pid = own_pid,
                        file = %path.display(),
                        "existing pid file already records this process"
                    );
                } else if process_alive(recorded)? {
                    info!(
                        target: PROCESS_TARGET,
                        pid = recorded,
                        own_pid,
                        "refusing to start: existing instance alive"
                    );
                    return Err(GuardError::AlreadyRunning { pid: recorded });
                } else {
                    warn!(
                        target: PROCESS_TARGET,
                        stale_pid = recorded,
                        file = %path.display(),
                        "stale pid file found; replacing"
                    );
                    write_pid_file(&path, own_pid, false)?;
                }
            }
        }
        Ok(Self {
            path,
            released: false,
        })
    }

    /// Path of the held pid file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Deletes the pid file and consumes the guard.
    pub fn release(mut self) {
        self.remove();
        self.released = true;
    }

    fn remove(&self) {
        match fs::remove_file(&self.path) {
            Err(error) if error.kind() != io::ErrorKind::NotFound => {
                warn!(
                    target: PROCESS_TARGET,
                    file = %self.path.display(),
                    error = %error,
                    "failed to remove pid file"
                );
            }
            _ => {}
        }
    }
}

impl Drop for PidFileGuard {
    fn drop(&mut self) {
        if !self.released {
            self.remove();
        }
    }
}

fn write_pid_file(path: &Path, pid: u32, exclusive: bool) -> Result<(), GuardError> {
    let mut options = OpenOptions::new();
    options.write(true);
    if exclusive {
        // A lost creation race surfaces as AlreadyExists and refuses startup.
        options.create_new(true);
    } else {
        options.create(true).truncate(true);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    let mut file = options.open(path).map_err(|source| GuardError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    write!(file, "{pid}").map_err(|source| GuardError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    file.sync_all().map_err(|source| GuardError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

fn process_alive(pid: u32) -> Result<bool, GuardError> {
    if pid == 0 {
        return Ok(false);
    }
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(()) => Ok(true),
        // The process exists but belongs to another user.
        Err(Errno::EPERM) => Ok(true),
        Err(Errno::ESRCH) | Err(Errno::ECHILD) => Ok(false),
        Err(errno) => Err(GuardError::Probe { pid, source: errno }),
    }
}
