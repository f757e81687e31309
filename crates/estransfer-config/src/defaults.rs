//! Default values shared between the configuration model and its documentation.

/// Default severity threshold.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default maximum size of the active log file, in megabytes.
pub const DEFAULT_LOG_MAXSIZE: u64 = 100;

/// Default number of rotated log files retained.
pub const DEFAULT_LOG_MAXBACKUPS: usize = 10;

/// Default maximum age of rotated log files, in days.
pub const DEFAULT_LOG_MAXAGE: u64 = 30;

/// Default pid file path, relative to the working directory.
pub const DEFAULT_PIDFILE: &str = "estransfer.pid";

/// Owned default severity threshold used where allocation is required.
pub fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_owned()
}

/// Owned default pid file path used where allocation is required.
pub fn default_pidfile() -> String {
    DEFAULT_PIDFILE.to_owned()
}
