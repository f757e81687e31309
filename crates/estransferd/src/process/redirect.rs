//! Standard stream redirection.
//!
//! Points the process's stdout and stderr at a log file so everything the
//! daemon (or any library it links) prints survives in one place. A previous
//! file at the target path is preserved under a timestamp suffix first;
//! silently clobbering prior output would defeat the point.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::info;

use super::PROCESS_TARGET;

/// Errors surfaced while redirecting the standard streams.
///
/// All of them are fatal startup failures: either both streams end up
/// redirected, or the process aborts with no partial state.
#[derive(Debug, Error)]
pub enum RedirectError {
    /// The previous output file could not be moved aside.
    #[error("failed to preserve previous output file '{path}' as '{backup}': {source}")]
    Preserve {
        /// Configured output path.
        path: PathBuf,
        /// Timestamped backup path the rename targeted.
        backup: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The output file could not be opened.
    #[error("failed to open output file '{path}': {source}")]
    Open {
        /// Configured output path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Replacing the standard stream descriptors failed.
    #[error("failed to redirect standard streams to '{path}': {source}")]
    Redirect {
        /// Configured output path.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

/// Redirects the process's stdout and stderr to `path`.
///
/// An existing file at `path` is renamed with a timestamp suffix so its
/// content survives. Returns the open file handle; the caller must keep it
/// alive for the process's lifetime, as closing it would invalidate the
/// redirected streams.
pub fn redirect_output(path: &Path) -> Result<File, RedirectError> {
    preserve_existing(path)?;
    let file = open_sync_append(path).map_err(|source| RedirectError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    redirect_standard_streams(&file).map_err(|source| RedirectError::Redirect {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        target: PROCESS_TARGET,
        file = %path.display(),
        "stdout and stderr redirected"
    );
    Ok(file)
}

/// Moves an existing file at `path` to a timestamp-suffixed backup.
pub(crate) fn preserve_existing(path: &Path) -> Result<Option<PathBuf>, RedirectError> {
    if !path.exists() {
        return Ok(None);
    }
    let backup = timestamped_backup(path);
    fs::rename(path, &backup).map_err(|source| RedirectError::Preserve {
        path: path.to_path_buf(),
        backup: backup.clone(),
        source,
    })?;
    info!(
        target: PROCESS_TARGET,
        from = %path.display(),
        to = %backup.display(),
        "previous output file preserved"
    );
    Ok(Some(backup))
}

fn timestamped_backup(path: &Path) -> PathBuf {
    let format = format_description!("[year]-[month]-[day]_[hour]:[minute]:[second]");
    // The local offset is unknowable once other threads exist; fall back to
    // UTC rather than refuse to preserve the file.
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let suffix = now
        .format(&format)
        .unwrap_or_else(|_| now.unix_timestamp().to_string());
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{suffix}"));
    PathBuf::from(name)
}

fn open_sync_append(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.append(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
        options.custom_flags(libc::O_SYNC);
    }
    options.open(path)
}

/// Replaces the process's stdout and stderr descriptor slots with `file`'s
/// descriptor. One implementation per target platform; POSIX duplicates the
/// descriptor with `dup2`.
#[cfg(unix)]
fn redirect_standard_streams(file: &File) -> io::Result<()> {
    use std::os::fd::AsRawFd;

    use nix::unistd::dup2;

    dup2(file.as_raw_fd(), libc::STDOUT_FILENO)?;
    dup2(file.as_raw_fd(), libc::STDERR_FILENO)?;
    Ok(())
}

#[cfg(not(unix))]
fn redirect_standard_streams(_file: &File) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "standard stream redirection requires a POSIX descriptor table",
    ))
}
