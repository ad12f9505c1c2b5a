//! CLI support for rendering simulation snapshots.
//!
//! This module provides parsing and rendering helpers for the
//! `sim-snapshot` binary. The binary delegates to these functions so they
//! can be exercised in tests without spawning a subprocess.
//!
//! Passing `--claw-score` and `--steps` registers the slug in the catalogue
//! before rendering; the catalogue file is rewritten atomically.

mod error;

use std::fmt;
use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use mockable::Clock;
use tracing::info;

pub use self::error::CliError;
use crate::atomic_io::write_atomic;
use crate::catalogue::RunbookCatalogue;
use crate::config::SnapshotSettings;
use crate::snapshot::{SnapshotRequest, SnapshotView, render_snapshot};
use crate::temporal::RunbookRef;

/// Parsed options for the snapshot CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    request: SnapshotRequest,
    catalogue_path: Option<PathBuf>,
    out_path: Option<Utf8PathBuf>,
    compact: bool,
    registration: Option<Registration>,
}

/// Score and step count for a runbook being added to the catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Registration {
    claw_score: u32,
    step_count: u32,
}

impl Options {
    /// Returns the snapshot request described by the arguments.
    ///
    /// # Example
    ///
    /// ```
    /// use seeded_sim::SnapshotView;
    /// use seeded_sim::snapshot_cli::{ParseOutcome, parse_args};
    ///
    /// let args = vec!["--slug".to_owned(), "ssh-hardening".to_owned()];
    /// let ParseOutcome::Options(options) = parse_args(args.into_iter()).expect("parse") else {
    ///     panic!("expected options");
    /// };
    ///
    /// assert_eq!(options.request().view, SnapshotView::Swarm);
    /// ```
    #[must_use]
    pub const fn request(&self) -> &SnapshotRequest {
        &self.request
    }

    /// Returns the output file, if one was requested.
    #[must_use]
    pub fn out_path(&self) -> Option<&Utf8Path> {
        self.out_path.as_deref()
    }
}

/// Outcome of parsing CLI arguments.
#[derive(Debug, Clone)]
pub enum ParseOutcome {
    /// Show help output and exit successfully.
    Help,
    /// Continue with the parsed options.
    Options(Options),
}

/// Parses CLI arguments into a snapshot request.
///
/// `--view` defaults to `swarm`.
///
/// # Errors
///
/// Returns [`CliError`] when `--slug` is missing, a flag lacks its value, an
/// argument is unknown, the view name is not recognised, or only one of
/// `--claw-score` and `--steps` is given.
///
/// # Example
///
/// ```
/// use seeded_sim::snapshot_cli::{ParseOutcome, parse_args};
///
/// let args = vec![
///     "--slug".to_owned(),
///     "ssh-hardening".to_owned(),
///     "--view".to_owned(),
///     "temporal".to_owned(),
/// ];
///
/// let outcome = parse_args(args.into_iter()).expect("parse args");
/// assert!(matches!(outcome, ParseOutcome::Options(_)));
/// ```
pub fn parse_args<I>(mut args: I) -> Result<ParseOutcome, CliError>
where
    I: Iterator<Item = String>,
{
    let mut slug: Option<String> = None;
    let mut view = SnapshotView::Swarm;
    let mut catalogue_path: Option<PathBuf> = None;
    let mut deployment_id: Option<String> = None;
    let mut event_id: Option<String> = None;
    let mut out_path: Option<Utf8PathBuf> = None;
    let mut compact = false;
    let mut claw_score: Option<u32> = None;
    let mut step_count: Option<u32> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(ParseOutcome::Help),
            "--slug" => slug = Some(next_value(&mut args, "--slug")?),
            "--view" => view = next_value(&mut args, "--view")?.parse()?,
            "--catalogue" => {
                catalogue_path = Some(PathBuf::from(next_value(&mut args, "--catalogue")?));
            }
            "--deployment" => deployment_id = Some(next_value(&mut args, "--deployment")?),
            "--event" => event_id = Some(next_value(&mut args, "--event")?),
            "--out" => out_path = Some(Utf8PathBuf::from(next_value(&mut args, "--out")?)),
            "--compact" => compact = true,
            "--claw-score" => {
                let value = next_value(&mut args, "--claw-score")?;
                claw_score = Some(parse_number(&value, "--claw-score")?);
            }
            "--steps" => {
                let value = next_value(&mut args, "--steps")?;
                step_count = Some(parse_number(&value, "--steps")?);
            }
            _ => return Err(CliError::UnknownArgument { value: arg }),
        }
    }

    let resolved_slug = slug.ok_or(CliError::MissingSlug)?;
    let registration = match (claw_score, step_count) {
        (Some(score), Some(steps)) => Some(Registration {
            claw_score: score,
            step_count: steps,
        }),
        (None, None) => None,
        _ => return Err(CliError::IncompleteRegistration),
    };
    Ok(ParseOutcome::Options(Options {
        request: SnapshotRequest {
            slug: resolved_slug,
            view,
            deployment_id,
            event_id,
        },
        catalogue_path,
        out_path,
        compact,
        registration,
    }))
}

/// Loads the catalogue, optionally registers the slug, renders the requested
/// view, and optionally writes it to `--out`.
///
/// Flags take precedence over `settings`. Returns the rendered JSON text.
///
/// # Errors
///
/// Returns [`CliError`] when the catalogue cannot be loaded or updated, the
/// snapshot cannot be rendered, or the output file cannot be written.
pub fn run_snapshot(
    options: &Options,
    settings: &SnapshotSettings,
    clock: &dyn Clock,
) -> Result<String, CliError> {
    let catalogue_path = utf8_path(
        options
            .catalogue_path
            .clone()
            .unwrap_or_else(|| settings.catalogue_path()),
    )?;
    let (catalogue_dir, catalogue_file) = open_parent(&catalogue_path)?;
    let mut catalogue = RunbookCatalogue::from_file(&catalogue_dir, catalogue_file)?;

    if let Some(registration) = options.registration {
        catalogue.append(RunbookRef {
            slug: options.request.slug.clone(),
            claw_score: registration.claw_score,
            step_count: registration.step_count,
        })?;
        catalogue.write_to_file(&catalogue_dir, catalogue_file)?;
        info!(
            slug = %options.request.slug,
            catalogue = %catalogue_path,
            "registered runbook"
        );
    }

    let value = render_snapshot(&options.request, &catalogue, clock)?;
    let pretty = settings.pretty && !options.compact;
    let rendered = if pretty {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .map_err(crate::error::SnapshotError::from)?;

    if let Some(out_path) = &options.out_path {
        let (out_dir, out_file) = open_parent(out_path)?;
        let mut contents = rendered.clone();
        contents.push('\n');
        write_atomic(&out_dir, out_file, &contents).map_err(|failure| {
            CliError::OutputWrite {
                path: out_path.clone(),
                message: failure.message,
            }
        })?;
    }

    info!(
        slug = %options.request.slug,
        view = %options.request.view,
        catalogue = %catalogue_path,
        out = options.out_path.as_ref().map(|p| p.as_str()),
        "rendered snapshot"
    );
    Ok(rendered)
}

/// Usage text printed for `--help`.
#[must_use]
pub const fn usage() -> &'static str {
    concat!(
        "Usage: sim-snapshot --slug <slug> [options]\n",
        "\n",
        "Options:\n",
        "  --slug <slug>          Runbook slug from the catalogue\n",
        "  --view <view>          swarm, temporal, provenance, verify, or proof (default swarm)\n",
        "  --catalogue <path>     Runbook catalogue JSON (default from SEEDED_SIM_CATALOGUE_PATH)\n",
        "  --deployment <id>      Deployment identifier for the swarm view\n",
        "  --event <id>           Event identifier for the proof view\n",
        "  --out <path>           Also write the JSON to this file\n",
        "  --compact              Emit single-line JSON\n",
        "  --claw-score <score>   Register the slug with this score (needs --steps)\n",
        "  --steps <count>        Register the slug with this step count\n",
        "  -h, --help             Print this help output\n",
    )
}

fn next_value<I>(args: &mut I, flag: &'static str) -> Result<String, CliError>
where
    I: Iterator<Item = String>,
{
    args.next().ok_or(CliError::MissingValue { flag })
}

fn parse_number<T>(value: &str, flag: &'static str) -> Result<T, CliError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    value.parse::<T>().map_err(|err| CliError::InvalidNumber {
        flag,
        value: value.to_owned(),
        message: err.to_string(),
    })
}

fn utf8_path(path: PathBuf) -> Result<Utf8PathBuf, CliError> {
    Utf8PathBuf::from_path_buf(path).map_err(|rejected| CliError::NonUtf8Path {
        path: rejected.to_string_lossy().into_owned(),
    })
}

/// Opens the directory containing `path` and returns it with the file name.
fn open_parent(path: &Utf8Path) -> Result<(Dir, &Utf8Path), CliError> {
    let file_name = path.file_name().map(Utf8Path::new).ok_or_else(|| {
        CliError::OpenDirectory {
            path: path.to_path_buf(),
            message: "path does not name a file".to_owned(),
        }
    })?;
    let parent = path
        .parent()
        .filter(|p| !p.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|err| {
        CliError::OpenDirectory {
            path: parent.to_path_buf(),
            message: err.to_string(),
        }
    })?;
    Ok((dir, file_name))
}
