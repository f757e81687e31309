//! Configuration model for the ESTransfer daemon.
//!
//! The daemon core consumes a validated [`Config`] object; this crate owns
//! that object and the loader that produces it. The file format follows the
//! original deployment layout: a TOML file named `estransfer.toml` inside a
//! configuration directory, with a `[general]` section for process lifecycle
//! options and a `[logging]` section for the structured logging subsystem.
//!
//! Every key has a default, so an empty file (or [`Config::default`]) yields
//! a fully usable configuration: info-level logging to standard output and a
//! pid file in the working directory.

mod defaults;
mod logging;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use logging::{LogLevel, LogLevelParseError, LoggingConfig};

/// Name of the configuration file inside the configuration directory.
pub const CONFIG_FILE_NAME: &str = "estransfer.toml";

/// Validated application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Process lifecycle options.
    pub general: GeneralConfig,
    /// Structured logging options.
    pub logging: LoggingConfig,
}

impl Config {
    /// Loads the configuration from `<config_dir>/estransfer.toml`.
    ///
    /// A missing or unparsable file is an error; startup must not proceed on
    /// a half-read configuration.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE_NAME);
        let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse { path, source })
    }
}

/// Process lifecycle options from the `[general]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Path of the pid file guarding single-instance execution.
    pub pidfile: String,
    /// Path the process's stdout/stderr are redirected to; empty disables
    /// redirection.
    #[serde(rename = "stdout-logfile")]
    pub stdout_logfile: String,
}

impl GeneralConfig {
    /// Redirection target, or `None` when redirection is disabled.
    #[must_use]
    pub fn stdout_logfile(&self) -> Option<&Path> {
        if self.stdout_logfile.is_empty() {
            None
        } else {
            Some(Path::new(&self.stdout_logfile))
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            pidfile: defaults::default_pidfile(),
            stdout_logfile: String::new(),
        }
    }
}

/// Errors raised while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file '{path}': {source}")]
    Read {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The configuration file was not valid TOML.
    #[error("failed to parse configuration file '{path}': {source}")]
    Parse {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, contents: &str) {
        fs::write(dir.path().join(CONFIG_FILE_NAME), contents)
            .expect("configuration file should be writable");
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.general.pidfile, "estransfer.pid");
        assert!(config.general.stdout_logfile().is_none());
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.filename().is_none());
        assert_eq!(config.logging.maxsize, 100);
        assert_eq!(config.logging.maxbackups, 10);
        assert_eq!(config.logging.maxage, 30);
        assert!(!config.logging.use_localtime);
        assert!(!config.logging.use_compression);
    }

    #[test]
    fn empty_file_yields_defaults() {
        let dir = TempDir::new().expect("temp dir");
        write_config(&dir, "");
        let config = Config::load(dir.path()).expect("empty file should load");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn sections_override_defaults() {
        let dir = TempDir::new().expect("temp dir");
        write_config(
            &dir,
            r#"
[general]
pidfile = "/run/estransfer/estransfer.pid"
stdout-logfile = "/var/log/estransfer/out.log"

[logging]
level = "warn"
filename = "/var/log/estransfer/estransfer.log"
maxsize = 25
maxbackups = 3
maxage = 7
use-localtime = true
use-compression = true
"#,
        );
        let config = Config::load(dir.path()).expect("file should load");
        assert_eq!(config.general.pidfile, "/run/estransfer/estransfer.pid");
        assert_eq!(
            config.general.stdout_logfile(),
            Some(Path::new("/var/log/estransfer/out.log"))
        );
        assert_eq!(config.logging.level, "warn");
        assert_eq!(
            config.logging.filename(),
            Some(Path::new("/var/log/estransfer/estransfer.log"))
        );
        assert_eq!(config.logging.maxsize, 25);
        assert_eq!(config.logging.maxbackups, 3);
        assert_eq!(config.logging.maxage, 7);
        assert!(config.logging.use_localtime);
        assert!(config.logging.use_compression);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new().expect("temp dir");
        let error = Config::load(dir.path()).expect_err("missing file must not load");
        assert!(matches!(error, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().expect("temp dir");
        write_config(&dir, "[logging\nlevel = ");
        let error = Config::load(dir.path()).expect_err("malformed file must not load");
        assert!(matches!(error, ConfigError::Parse { .. }));
    }

    #[test]
    fn unrecognised_level_survives_loading() {
        // Degradation to info happens when the logger is configured, not here;
        // a typo in the level must not be a startup failure.
        let dir = TempDir::new().expect("temp dir");
        write_config(&dir, "[logging]\nlevel = \"verbose\"\n");
        let config = Config::load(dir.path()).expect("file should load");
        assert_eq!(config.logging.level, "verbose");
    }
}
