//! Structured logging for the daemon.
//!
//! [`configure`] builds an explicitly owned `tracing` dispatcher emitting one
//! JSON object per record, together with a [`LevelHandle`] that adjusts the
//! severity threshold at runtime. The dispatcher is never installed globally;
//! it travels inside the [`ApplicationContext`](crate::ApplicationContext)
//! and the lifecycle scopes it over the daemon run via [`Logger::scope`].
//!
//! Records go either to standard output (taking the stdout lock per record so
//! concurrent writers never interleave) or to a size-bounded rolling file
//! sink, selected by `logging.filename`.

mod rolling;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;
use time::UtcOffset;
use time::format_description::well_known::Rfc3339;
use tracing::{Dispatch, Level, dispatcher, warn};
use tracing_subscriber::Layer as _;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::fmt::writer::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::Registry;

use estransfer_config::{LogLevel, LoggingConfig};

use rolling::{RollingWriter, RotationPolicy};

pub(crate) const TELEMETRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::telemetry");

/// Errors encountered while configuring the logging subsystem.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The rotating log sink could not be opened.
    #[error("failed to open log file '{path}': {source}")]
    OpenSink {
        /// Configured log file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Explicitly owned logger handle.
///
/// Wraps the `tracing` dispatcher so callers can scope it over a region of
/// code without touching the process-wide default subscriber.
#[derive(Clone, Debug)]
pub struct Logger {
    dispatch: Dispatch,
}

impl Logger {
    /// The underlying dispatcher.
    #[must_use]
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Runs `f` with this logger as the current-thread dispatcher.
    pub fn scope<T>(&self, f: impl FnOnce() -> T) -> T {
        dispatcher::with_default(&self.dispatch, f)
    }
}

/// Shared, runtime-mutable severity threshold.
///
/// Reads happen on every record before any formatting work, so the value is
/// a lock-free atomic; producers are never blocked by a level change.
#[derive(Clone, Debug)]
pub struct LevelHandle {
    level: Arc<AtomicUsize>,
}

impl LevelHandle {
    fn new(level: LogLevel) -> Self {
        Self {
            level: Arc::new(AtomicUsize::new(level as usize)),
        }
    }

    /// Replaces the severity threshold for all subsequent records.
    pub fn set(&self, level: LogLevel) {
        self.level.store(level as usize, Ordering::Relaxed);
    }

    /// The current severity threshold.
    #[must_use]
    pub fn get(&self) -> LogLevel {
        level_from_rank(self.level.load(Ordering::Relaxed))
    }

    fn admits(&self, level: &Level) -> bool {
        record_rank(level) >= self.level.load(Ordering::Relaxed)
    }
}

/// A configured logger and its severity handle.
#[derive(Clone, Debug)]
pub struct Telemetry {
    logger: Logger,
    level: LevelHandle,
}

impl Telemetry {
    /// The configured logger.
    #[must_use]
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// The runtime-mutable severity handle.
    #[must_use]
    pub fn level(&self) -> &LevelHandle {
        &self.level
    }

    /// Splits the telemetry into its parts.
    #[must_use]
    pub fn into_parts(self) -> (Logger, LevelHandle) {
        (self.logger, self.level)
    }
}

/// Builds the logging subsystem described by `config`.
///
/// An unrecognised severity name degrades to `info` with a warning through
/// the freshly built logger; it is never a startup failure. Records below
/// the threshold are dropped before any formatting work.
pub fn configure(config: &LoggingConfig) -> Result<Telemetry, TelemetryError> {
    let (initial, fallback) = resolve_level(&config.level);
    let level = LevelHandle::new(initial);

    let sink = match config.filename() {
        Some(path) => {
            let writer = RollingWriter::open(path, RotationPolicy::from_config(config)).map_err(
                |source| TelemetryError::OpenSink {
                    path: path.to_path_buf(),
                    source,
                },
            )?;
            LogSink::Rolling(writer)
        }
        None => LogSink::Stdout,
    };

    let filter = filter_fn({
        let level = level.clone();
        move |metadata| level.admits(metadata.level())
    });
    let layer = fmt::layer()
        .json()
        .flatten_event(true)
        .with_timer(record_timer(config.use_localtime))
        .with_writer(sink)
        .with_filter(filter);
    let logger = Logger {
        dispatch: Dispatch::new(Registry::default().with(layer)),
    };

    if fallback {
        logger.scope(|| {
            warn!(
                target: TELEMETRY_TARGET,
                supplied = %config.level,
                "unrecognised log level; defaulting to info"
            );
        });
    }

    Ok(Telemetry { logger, level })
}

/// Derives a child logging scope bound to fixed component fields.
///
/// Spans share the dispatcher's sink and severity handle; callers create
/// them inside [`Logger::scope`].
#[must_use]
pub fn component_span(kind: &str, name: &str) -> tracing::Span {
    // The field is `component` rather than `name` so it cannot collide with
    // the span's own name in the JSON encoding.
    tracing::info_span!("component", kind, component = name)
}

fn resolve_level(raw: &str) -> (LogLevel, bool) {
    if raw.is_empty() {
        return (LogLevel::Info, false);
    }
    match raw.parse::<LogLevel>() {
        Ok(level) => (level, false),
        Err(_) => (LogLevel::Info, true),
    }
}

fn record_timer(use_localtime: bool) -> OffsetTime<Rfc3339> {
    // The local offset is unknowable once other threads exist; fall back to
    // UTC rather than fail the whole logging subsystem.
    let offset = if use_localtime {
        UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
    } else {
        UtcOffset::UTC
    };
    OffsetTime::new(offset, Rfc3339)
}

fn record_rank(level: &Level) -> usize {
    if *level == Level::ERROR {
        3
    } else if *level == Level::WARN {
        2
    } else if *level == Level::INFO {
        1
    } else {
        0
    }
}

const fn level_from_rank(rank: usize) -> LogLevel {
    match rank {
        0 => LogLevel::Debug,
        1 => LogLevel::Info,
        2 => LogLevel::Warn,
        3 => LogLevel::Error,
        4 => LogLevel::Panic,
        _ => LogLevel::Fatal,
    }
}

/// Record sink selected by the configuration.
#[derive(Clone, Debug)]
enum LogSink {
    Stdout,
    Rolling(RollingWriter),
}

enum SinkWriter {
    Stdout(io::StdoutLock<'static>),
    Rolling(RollingWriter),
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = SinkWriter;

    fn make_writer(&'a self) -> Self::Writer {
        match self {
            Self::Stdout => SinkWriter::Stdout(io::stdout().lock()),
            Self::Rolling(writer) => SinkWriter::Rolling(writer.clone()),
        }
    }
}

impl Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Stdout(lock) => lock.write(buf),
            Self::Rolling(writer) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Stdout(lock) => lock.flush(),
            Self::Rolling(writer) => writer.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    use serde_json::Value;
    use tempfile::TempDir;
    use tracing::{debug, error, info};

    fn file_config(path: &Path) -> LoggingConfig {
        LoggingConfig {
            filename: path.display().to_string(),
            ..LoggingConfig::default()
        }
    }

    fn read_records(path: &Path) -> Vec<Value> {
        fs::read_to_string(path)
            .expect("log file should be readable")
            .lines()
            .map(|line| serde_json::from_str(line).expect("each record should be one JSON object"))
            .collect()
    }

    fn messages(records: &[Value]) -> Vec<String> {
        records
            .iter()
            .filter_map(|record| record.get("message"))
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn records_below_threshold_are_dropped() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("estransfer.log");
        let mut config = file_config(&path);
        config.level = "warn".to_owned();
        let telemetry = configure(&config).expect("telemetry should configure");

        telemetry.logger().scope(|| {
            info!("suppressed");
            tracing::warn!("emitted");
        });

        let records = read_records(&path);
        let messages = messages(&records);
        assert_eq!(messages, vec!["emitted"]);
        assert_eq!(
            records[0].get("level").and_then(Value::as_str),
            Some("WARN")
        );
    }

    #[test]
    fn level_change_takes_effect_without_rebuilding() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("estransfer.log");
        let telemetry = configure(&file_config(&path)).expect("telemetry should configure");
        let (logger, level) = telemetry.into_parts();

        logger.scope(|| info!("before"));
        level.set(LogLevel::Error);
        logger.scope(|| {
            info!("hidden");
            error!("after");
        });

        assert_eq!(messages(&read_records(&path)), vec!["before", "after"]);
    }

    #[test]
    fn panic_threshold_admits_no_records() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("estransfer.log");
        let mut config = file_config(&path);
        config.level = "panic".to_owned();
        let telemetry = configure(&config).expect("telemetry should configure");

        telemetry.logger().scope(|| error!("still below panic"));

        assert!(read_records(&path).is_empty());
    }

    #[test]
    fn unrecognised_level_warns_and_defaults_to_info() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("estransfer.log");
        let mut config = file_config(&path);
        config.level = "verbose".to_owned();
        let telemetry = configure(&config).expect("telemetry should configure");

        assert_eq!(telemetry.level().get(), LogLevel::Info);
        telemetry.logger().scope(|| debug!("still suppressed"));

        let records = read_records(&path);
        assert_eq!(records.len(), 1, "only the fallback warning should appear");
        assert_eq!(
            records[0].get("level").and_then(Value::as_str),
            Some("WARN")
        );
        assert_eq!(
            records[0].get("supplied").and_then(Value::as_str),
            Some("verbose")
        );
    }

    #[test]
    fn level_handle_is_shared_across_clones() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("estransfer.log");
        let telemetry = configure(&file_config(&path)).expect("telemetry should configure");

        let clone = telemetry.level().clone();
        clone.set(LogLevel::Fatal);
        assert_eq!(telemetry.level().get(), LogLevel::Fatal);
    }

    #[test]
    fn component_span_fields_reach_the_record() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("estransfer.log");
        let telemetry = configure(&file_config(&path)).expect("telemetry should configure");

        telemetry.logger().scope(|| {
            let span = component_span("main", "estransfer");
            let _entered = span.enter();
            info!("inside component");
        });

        let records = read_records(&path);
        assert_eq!(records.len(), 1);
        let span = records[0].get("span").expect("record should carry its span");
        assert_eq!(span.get("kind").and_then(Value::as_str), Some("main"));
        assert_eq!(
            span.get("component").and_then(Value::as_str),
            Some("estransfer")
        );
    }
}
