//! Error types for the snapshot CLI.

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::error::{CatalogueError, SnapshotError};

/// Errors surfaced by the CLI parsing and rendering flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CliError {
    /// Runbook slug was not supplied.
    #[error("missing required flag: --slug")]
    MissingSlug,
    /// A flag expected a value but none was provided.
    #[error("missing value for {flag}")]
    MissingValue {
        /// Flag that was missing its value.
        flag: &'static str,
    },
    /// A numeric flag value could not be parsed.
    #[error("invalid value for {flag}: '{value}' ({message})")]
    InvalidNumber {
        /// Flag associated with the invalid number.
        flag: &'static str,
        /// Raw value supplied for the flag.
        value: String,
        /// Parser error message.
        message: String,
    },
    /// Only one of the registration flags was supplied.
    #[error("--claw-score and --steps must be given together")]
    IncompleteRegistration,
    /// An unsupported argument was supplied.
    #[error("unknown argument: {value}")]
    UnknownArgument {
        /// Argument value that was not recognised.
        value: String,
    },
    /// A path could not be represented as UTF-8.
    #[error("path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the rejected path.
        path: String,
    },
    /// The directory holding a file could not be opened.
    #[error("failed to open directory '{path}': {message}")]
    OpenDirectory {
        /// Directory that failed to open.
        path: Utf8PathBuf,
        /// Description of the I/O error.
        message: String,
    },
    /// The rendered snapshot could not be written.
    #[error("failed to write snapshot to '{path}': {message}")]
    OutputWrite {
        /// Output path.
        path: Utf8PathBuf,
        /// Description of the I/O error.
        message: String,
    },
    /// The catalogue could not be loaded.
    #[error("catalogue error: {source}")]
    Catalogue {
        /// Underlying catalogue error.
        #[from]
        #[source]
        source: CatalogueError,
    },
    /// The snapshot could not be rendered.
    #[error("snapshot error: {source}")]
    Snapshot {
        /// Underlying snapshot error.
        #[from]
        #[source]
        source: SnapshotError,
    },
}
