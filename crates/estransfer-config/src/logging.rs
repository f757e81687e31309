use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::defaults;

/// Ordered severity set recognised by the logging subsystem.
///
/// `Panic` and `Fatal` exist as configurable thresholds for compatibility
/// with deployments that set them; no record carries those severities, so
/// either value suppresses all output.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Deserialize,
    Serialize,
    EnumString,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogLevel {
    /// Diagnostic detail.
    Debug,
    /// Routine operational records.
    #[default]
    Info,
    /// Unexpected but tolerated conditions.
    Warn,
    /// Failures that need attention.
    Error,
    /// Threshold-only severity; admits no records.
    Panic,
    /// Threshold-only severity; admits no records.
    Fatal,
}

/// Errors encountered while parsing a [`LogLevel`] from text.
pub type LogLevelParseError = strum::ParseError;

/// Structured logging options from the `[logging]` section.
///
/// The severity threshold is kept as raw text so an unrecognised value can
/// degrade to a warning when the logger is configured instead of failing the
/// configuration load.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Severity threshold; one of the [`LogLevel`] names, case-insensitive.
    pub level: String,
    /// Log file path; empty selects standard output without rotation.
    pub filename: String,
    /// Maximum size of the active log file in megabytes before rotation.
    pub maxsize: u64,
    /// Number of rotated files retained; older files beyond the count are
    /// deleted.
    pub maxbackups: usize,
    /// Maximum age of rotated files in days; zero disables age pruning.
    pub maxage: u64,
    /// Record timestamps in local time instead of UTC.
    #[serde(rename = "use-localtime")]
    pub use_localtime: bool,
    /// Compress rotated files with gzip.
    #[serde(rename = "use-compression")]
    pub use_compression: bool,
}

impl LoggingConfig {
    /// Log file target, or `None` when records go to standard output.
    #[must_use]
    pub fn filename(&self) -> Option<&Path> {
        if self.filename.is_empty() {
            None
        } else {
            Some(Path::new(&self.filename))
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::default_log_level(),
            filename: String::new(),
            maxsize: defaults::DEFAULT_LOG_MAXSIZE,
            maxbackups: defaults::DEFAULT_LOG_MAXBACKUPS,
            maxage: defaults::DEFAULT_LOG_MAXAGE,
            use_localtime: false,
            use_compression: false,
        }
    }
}
