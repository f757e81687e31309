//! Binary entry point for the ESTransfer daemon.
//!
//! Loads the configuration, runs the daemon lifecycle, and converts the
//! returned result into the process exit status; no status code exists
//! anywhere else. A human-readable summary line goes to stderr on the way
//! out so operators can tell a clean stop from a failure without parsing
//! logs.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use time::OffsetDateTime;
use time::macros::format_description;

use estransfer_config::Config;

#[derive(Debug, Parser)]
#[command(
    name = "estransferd",
    about = "Single-instance data transfer daemon scaffold",
    version
)]
struct Args {
    /// Directory that contains the configuration file.
    #[arg(long = "config-dir", default_value = "./config")]
    config_dir: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();

    eprintln!("Reading configuration from {}", args.config_dir.display());
    let config = match Config::load(&args.config_dir) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Failed reading configuration: {error}");
            eprintln!("estransferd failed at {}", human_timestamp());
            return ExitCode::FAILURE;
        }
    };

    match estransferd::run_daemon(config) {
        Ok(()) => {
            eprintln!("Stopped estransferd at {}", human_timestamp());
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("estransferd failed at {}: {error}", human_timestamp());
            ExitCode::FAILURE
        }
    }
}

fn human_timestamp() -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    // The local offset is unknowable once other threads exist; fall back to
    // UTC rather than skip the summary line.
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(&format)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}
