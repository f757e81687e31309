//! Size-bounded rolling file sink for the logging subsystem.
//!
//! The active file rolls over when a write would push it past the configured
//! size. Backups are numbered `<name>.1` (newest) through `<name>.N`; the
//! oldest beyond the retention count is deleted, backups past the age limit
//! are pruned by modification time, and fresh backups are optionally
//! gzip-compressed to `<name>.n.gz`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use flate2::Compression;
use flate2::write::GzEncoder;

use estransfer_config::LoggingConfig;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Retention and rotation limits for the active log file.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RotationPolicy {
    /// Size that triggers rotation, in bytes.
    pub(crate) max_bytes: u64,
    /// Rotated files retained; zero discards the file on rotation.
    pub(crate) max_backups: usize,
    /// Backup age limit in days; zero disables age pruning.
    pub(crate) max_age_days: u64,
    /// Gzip fresh backups.
    pub(crate) compress: bool,
}

impl RotationPolicy {
    pub(crate) fn from_config(config: &LoggingConfig) -> Self {
        Self {
            max_bytes: config.maxsize * 1024 * 1024,
            max_backups: config.maxbackups,
            max_age_days: config.maxage,
            compress: config.use_compression,
        }
    }
}

/// Shared handle over the active log file.
///
/// Rotation and in-flight writes are serialised by the interior mutex, so a
/// record is never split across a rollover.
#[derive(Debug, Clone)]
pub(crate) struct RollingWriter {
    inner: Arc<Mutex<ActiveFile>>,
}

impl RollingWriter {
    pub(crate) fn open(path: &Path, policy: RotationPolicy) -> io::Result<Self> {
        let file = open_active(path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            inner: Arc::new(Mutex::new(ActiveFile {
                path: path.to_path_buf(),
                file,
                written,
                policy,
            })),
        })
    }
}

impl Write for RollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut active = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        active.write_record(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut active = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        active.file.flush()
    }
}

#[derive(Debug)]
struct ActiveFile {
    path: PathBuf,
    file: File,
    written: u64,
    policy: RotationPolicy,
}

impl ActiveFile {
    fn write_record(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.policy.max_bytes {
            self.rotate()?;
        }
        self.file.write_all(buf)?;
        self.written += buf.len() as u64;
        Ok(buf.len())
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.policy.max_backups == 0 {
            fs::remove_file(&self.path)?;
        } else {
            shift_backups(&self.path, self.policy.max_backups)?;
            let newest = numbered_path(&self.path, 1);
            fs::rename(&self.path, &newest)?;
            if self.policy.compress {
                compress_backup(&newest)?;
            }
        }
        prune_aged(&self.path, self.policy.max_backups, self.policy.max_age_days);
        self.file = open_active(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

fn open_active(path: &Path) -> io::Result<File> {
    OpenOptions::new().append(true).create(true).open(path)
}

/// Shift `<name>.n` to `<name>.n+1` for n = max_backups-1 … 1, dropping the
/// copy that would exceed the retention count. Compressed backups shift
/// alongside their plain counterparts.
fn shift_backups(base: &Path, max_backups: usize) -> io::Result<()> {
    remove_if_present(&numbered_path(base, max_backups))?;
    remove_if_present(&gzip_path(&numbered_path(base, max_backups)))?;
    for n in (1..max_backups).rev() {
        rename_if_present(&numbered_path(base, n), &numbered_path(base, n + 1))?;
        rename_if_present(
            &gzip_path(&numbered_path(base, n)),
            &gzip_path(&numbered_path(base, n + 1)),
        )?;
    }
    Ok(())
}

fn compress_backup(path: &Path) -> io::Result<()> {
    let mut source = File::open(path)?;
    let target = File::create(gzip_path(path))?;
    let mut encoder = GzEncoder::new(target, Compression::default());
    io::copy(&mut source, &mut encoder)?;
    encoder.finish()?;
    fs::remove_file(path)
}

/// Best-effort deletion of backups older than the age limit; rotation must
/// not fail because an old file could not be examined.
fn prune_aged(base: &Path, max_backups: usize, max_age_days: u64) {
    if max_age_days == 0 {
        return;
    }
    let Some(horizon) =
        SystemTime::now().checked_sub(Duration::from_secs(max_age_days * SECONDS_PER_DAY))
    else {
        return;
    };
    for n in 1..=max_backups {
        let numbered = numbered_path(base, n);
        for candidate in [gzip_path(&numbered), numbered] {
            let Ok(metadata) = fs::metadata(&candidate) else {
                continue;
            };
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            if modified < horizon {
                let _ = fs::remove_file(&candidate);
            }
        }
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(error),
    }
}

fn rename_if_present(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(error),
    }
}

fn numbered_path(base: &Path, n: usize) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(format!(".{n}"));
    PathBuf::from(name)
}

fn gzip_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".gz");
    PathBuf::from(name)
}
