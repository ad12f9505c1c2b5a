//! Snapshot CLI for rendering simulation views of catalogue runbooks.
//!
//! This binary delegates to `seeded_sim::snapshot_cli` for parsing and
//! rendering, keeping the CLI behaviour testable without spawning a process.
//! Structured logs go to stderr; the rendered JSON goes to stdout.

use std::env;
use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitCode;

use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use seeded_sim::SnapshotSettings;
use seeded_sim::snapshot_cli::{CliError, ParseOutcome, parse_args, run_snapshot, usage};
use tracing::{error, warn};
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> ExitCode {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "snapshot failed");
            if let Err(write_err) = writeln!(io::stderr().lock(), "{err}") {
                drop(write_err);
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), CliError> {
    match parse_args(env::args().skip(1))? {
        ParseOutcome::Help => {
            write_stdout(usage());
            Ok(())
        }
        ParseOutcome::Options(options) => {
            let settings = load_settings();
            let rendered = run_snapshot(&options, &settings, &DefaultClock)?;
            write_stdout(&rendered);
            write_stdout("\n");
            Ok(())
        }
    }
}

/// Loads settings from the environment and config files only; flags are
/// handled by `parse_args`.
fn load_settings() -> SnapshotSettings {
    match SnapshotSettings::load_from_iter([OsString::from("sim-snapshot")]) {
        Ok(settings) => settings,
        Err(e) => {
            warn!(error = %e, "failed to load settings, using defaults");
            SnapshotSettings {
                catalogue_path: None,
                pretty: true,
            }
        }
    }
}

fn write_stdout(text: &str) {
    if let Err(err) = io::stdout().lock().write_all(text.as_bytes()) {
        drop(err);
    }
}
