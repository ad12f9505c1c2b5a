//! Error types for the seeded-sim crate.
//!
//! This module defines semantic error enums for seeded derivation, catalogue
//! parsing, and snapshot rendering, following the project's error handling
//! conventions with `thiserror`.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors raised by the bounded derivation helpers.
///
/// Both variants describe programming mistakes at the call site. They are
/// never recovered by clamping; retrying with the same input fails the same
/// way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DerivationError {
    /// The requested integer range is inverted.
    #[error("invalid derivation range: max {max} is below min {min}")]
    InvalidRange {
        /// Lower bound supplied by the caller.
        min: i64,
        /// Upper bound supplied by the caller.
        max: i64,
    },

    /// A categorical selection was attempted over an empty option list.
    #[error("cannot select from an empty option list (seed '{seed}')")]
    EmptyOptions {
        /// Seed that requested the selection.
        seed: String,
    },
}

/// Errors that can occur when parsing, querying, or writing a runbook
/// catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogueError {
    /// The catalogue file could not be read.
    #[error("failed to read catalogue file at '{path}': {message}")]
    IoError {
        /// Path to the catalogue file.
        path: Utf8PathBuf,
        /// Description of the I/O error.
        message: String,
    },

    /// The catalogue file could not be written.
    #[error("failed to write catalogue file at '{path}': {message}")]
    WriteError {
        /// Path to the catalogue file.
        path: Utf8PathBuf,
        /// Description of the I/O error.
        message: String,
    },

    /// The catalogue JSON is malformed or missing required fields.
    #[error("invalid catalogue JSON: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
    },

    /// The catalogue version is not supported.
    #[error("unsupported catalogue version: expected {expected}, found {actual}")]
    UnsupportedVersion {
        /// Expected version number.
        expected: u32,
        /// Actual version found in the catalogue.
        actual: u32,
    },

    /// The catalogue contains no runbooks.
    #[error("catalogue contains no runbooks")]
    EmptyRunbooks,

    /// A runbook slug is not a lowercase, hyphenated identifier.
    #[error("invalid runbook slug at index {index}: '{value}'")]
    InvalidSlug {
        /// Index of the runbook in the array.
        index: usize,
        /// The rejected slug.
        value: String,
    },

    /// A runbook score lies outside `0..=100`.
    #[error("runbook '{slug}' has claw score {score}, expected at most 100")]
    ScoreOutOfRange {
        /// Slug of the offending runbook.
        slug: String,
        /// The rejected score.
        score: u32,
    },

    /// A runbook declares no steps.
    #[error("runbook '{slug}' must declare at least one step")]
    NoSteps {
        /// Slug of the offending runbook.
        slug: String,
    },

    /// The same slug appears more than once.
    #[error("runbook '{slug}' already exists in catalogue")]
    DuplicateSlug {
        /// The duplicated slug.
        slug: String,
    },

    /// The requested slug was not found in the catalogue.
    #[error("runbook '{slug}' not found in catalogue")]
    RunbookNotFound {
        /// The slug that was not found.
        slug: String,
    },
}

/// Errors raised while rendering a simulation snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// Seeded derivation failed.
    #[error("derivation failed: {0}")]
    Derivation(#[from] DerivationError),

    /// The runbook catalogue could not satisfy the request.
    #[error("catalogue error: {0}")]
    Catalogue(#[from] CatalogueError),

    /// The requested view name is not one of the supported views.
    #[error("unknown snapshot view '{view}'; expected one of swarm, temporal, provenance, verify, proof")]
    UnknownView {
        /// The rejected view name.
        view: String,
    },

    /// The `proof` view was requested without an event identifier.
    #[error("the proof view requires an event identifier")]
    MissingEventId,

    /// The snapshot could not be serialised.
    #[error("failed to serialise snapshot: {message}")]
    Serialisation {
        /// Serializer error message.
        message: String,
    },
}

impl From<serde_json::Error> for SnapshotError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialisation {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_range_formats_correctly() {
        let err = DerivationError::InvalidRange { min: 5, max: 2 };
        assert_eq!(
            err.to_string(),
            "invalid derivation range: max 2 is below min 5"
        );
    }

    #[test]
    fn empty_options_formats_correctly() {
        let err = DerivationError::EmptyOptions {
            seed: "sw-demo:zone".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "cannot select from an empty option list (seed 'sw-demo:zone')"
        );
    }

    #[test]
    fn catalogue_io_error_formats_correctly() {
        let err = CatalogueError::IoError {
            path: Utf8PathBuf::from("/tmp/runbooks.json"),
            message: "file not found".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "failed to read catalogue file at '/tmp/runbooks.json': file not found"
        );
    }

    #[test]
    fn catalogue_version_error_formats_correctly() {
        let err = CatalogueError::UnsupportedVersion {
            expected: 1,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "unsupported catalogue version: expected 1, found 3"
        );
    }

    #[test]
    fn catalogue_not_found_formats_correctly() {
        let err = CatalogueError::RunbookNotFound {
            slug: "nginx-hardening".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "runbook 'nginx-hardening' not found in catalogue"
        );
    }

    #[test]
    fn snapshot_error_wraps_derivation_error() {
        let err = SnapshotError::from(DerivationError::InvalidRange { min: 1, max: 0 });
        assert_eq!(
            err.to_string(),
            "derivation failed: invalid derivation range: max 0 is below min 1"
        );
    }
}
