//! Shared fixtures for the lifecycle behaviour tests.

use std::fs;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;
use tempfile::TempDir;

use estransfer_config::Config;

pub(crate) const WAIT_TIMEOUT: Duration = Duration::from_secs(2);
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Filesystem sandbox for one daemon run.
pub(crate) struct DaemonWorld {
    temp: TempDir,
}

impl DaemonWorld {
    pub(crate) fn new() -> Self {
        Self {
            temp: TempDir::new().expect("temp dir should create"),
        }
    }

    pub(crate) fn pid_path(&self) -> PathBuf {
        self.temp.path().join("estransfer.pid")
    }

    pub(crate) fn log_path(&self) -> PathBuf {
        self.temp.path().join("estransfer.log")
    }

    /// A configuration pointing every artefact into the sandbox.
    pub(crate) fn config(&self, level: &str) -> Config {
        let mut config = Config::default();
        config.general.pidfile = self.pid_path().display().to_string();
        config.logging.level = level.to_owned();
        config.logging.filename = self.log_path().display().to_string();
        config
    }

    /// Blocks until the daemon under test has written its pid file.
    pub(crate) fn wait_for_pid_file(&self) {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        while !self.pid_path().exists() {
            assert!(
                Instant::now() < deadline,
                "daemon did not write its pid file within {WAIT_TIMEOUT:?}"
            );
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Messages of every record the daemon wrote, in emission order.
    pub(crate) fn logged_messages(&self) -> Vec<String> {
        let raw = match fs::read_to_string(self.log_path()) {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };
        raw.lines()
            .map(|line| {
                serde_json::from_str::<Value>(line).expect("each record should be one JSON object")
            })
            .filter_map(|record| {
                record
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
            })
            .collect()
    }
}

/// A live process the current user owns, for already-running scenarios.
pub(crate) struct LiveProcess(Child);

impl LiveProcess {
    pub(crate) fn spawn() -> Self {
        let child = Command::new("sleep")
            .arg("60")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("sleep should spawn");
        Self(child)
    }

    pub(crate) fn pid(&self) -> u32 {
        self.0.id()
    }
}

impl Drop for LiveProcess {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}
