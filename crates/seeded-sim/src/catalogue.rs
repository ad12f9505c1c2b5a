//! Runbook catalogue types and JSON parsing.
//!
//! The catalogue lists the runbooks the simulations can be generated for,
//! with the score and step count that feed the temporal history. It is
//! loaded from a versioned JSON document and can be extended and written
//! back atomically.

use camino::Utf8Path;
use cap_std::fs::Dir;
use serde::{Deserialize, Serialize};

use crate::atomic_io::write_atomic;
use crate::error::CatalogueError;
use crate::ident::is_valid_slug;
use crate::temporal::RunbookRef;

/// Current supported catalogue version.
const SUPPORTED_VERSION: u32 = 1;

const MAX_SCORE: u32 = 100;

/// A validated list of runbooks.
///
/// # Example
///
/// ```
/// use seeded_sim::RunbookCatalogue;
///
/// let json = r#"{
///     "version": 1,
///     "runbooks": [{"slug": "ssh-hardening", "clawScore": 94, "stepCount": 7}]
/// }"#;
///
/// let catalogue = RunbookCatalogue::from_json(json).expect("valid catalogue");
/// assert_eq!(catalogue.runbooks().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunbookCatalogue {
    version: u32,
    runbooks: Vec<RunbookRef>,
}

impl RunbookCatalogue {
    /// Parses a catalogue from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError`] if:
    /// - The JSON is malformed or missing fields
    /// - The version is unsupported
    /// - The runbook list is empty
    /// - Any runbook has an invalid slug, a score above 100, or no steps
    /// - A slug appears twice
    pub fn from_json(json: &str) -> Result<Self, CatalogueError> {
        let raw: RawCatalogue =
            serde_json::from_str(json).map_err(|e| CatalogueError::ParseError {
                message: e.to_string(),
            })?;

        Self::from_raw(raw)
    }

    /// Loads a catalogue from a file inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError`] if the file cannot be read or parsed.
    pub fn from_file(dir: &Dir, path: &Utf8Path) -> Result<Self, CatalogueError> {
        let contents = dir
            .read_to_string(path)
            .map_err(|e| CatalogueError::IoError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        Self::from_json(&contents)
    }

    fn from_raw(raw: RawCatalogue) -> Result<Self, CatalogueError> {
        if raw.version != SUPPORTED_VERSION {
            return Err(CatalogueError::UnsupportedVersion {
                expected: SUPPORTED_VERSION,
                actual: raw.version,
            });
        }
        if raw.runbooks.is_empty() {
            return Err(CatalogueError::EmptyRunbooks);
        }

        let mut catalogue = Self {
            version: raw.version,
            runbooks: Vec::with_capacity(raw.runbooks.len()),
        };
        for (index, runbook) in raw.runbooks.into_iter().enumerate() {
            catalogue.insert(index, runbook)?;
        }
        Ok(catalogue)
    }

    fn insert(&mut self, index: usize, runbook: RunbookRef) -> Result<(), CatalogueError> {
        if !is_valid_slug(&runbook.slug) {
            return Err(CatalogueError::InvalidSlug {
                index,
                value: runbook.slug,
            });
        }
        if runbook.claw_score > MAX_SCORE {
            return Err(CatalogueError::ScoreOutOfRange {
                slug: runbook.slug,
                score: runbook.claw_score,
            });
        }
        if runbook.step_count == 0 {
            return Err(CatalogueError::NoSteps { slug: runbook.slug });
        }
        if self.runbooks.iter().any(|r| r.slug == runbook.slug) {
            return Err(CatalogueError::DuplicateSlug { slug: runbook.slug });
        }
        self.runbooks.push(runbook);
        Ok(())
    }

    /// Returns the catalogue version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Returns all runbooks in file order.
    #[must_use]
    pub fn runbooks(&self) -> &[RunbookRef] {
        &self.runbooks
    }

    /// Finds a runbook by slug.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError::RunbookNotFound`] if no runbook has the slug.
    pub fn find(&self, slug: &str) -> Result<&RunbookRef, CatalogueError> {
        self.runbooks
            .iter()
            .find(|r| r.slug == slug)
            .ok_or_else(|| CatalogueError::RunbookNotFound {
                slug: slug.to_owned(),
            })
    }

    /// Appends a runbook after validating it like a parsed entry.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError`] for an invalid slug, score, or step count,
    /// or when the slug already exists.
    pub fn append(&mut self, runbook: RunbookRef) -> Result<(), CatalogueError> {
        self.insert(self.runbooks.len(), runbook)
    }

    /// Writes the catalogue as pretty JSON to `path` inside `dir`.
    ///
    /// The file is replaced atomically.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError::WriteError`] if the file cannot be written,
    /// or [`CatalogueError::ParseError`] if serialisation fails.
    pub fn write_to_file(&self, dir: &Dir, path: &Utf8Path) -> Result<(), CatalogueError> {
        let document = CatalogueDocument {
            version: self.version,
            runbooks: &self.runbooks,
        };
        let mut contents =
            serde_json::to_string_pretty(&document).map_err(|e| CatalogueError::ParseError {
                message: e.to_string(),
            })?;
        contents.push('\n');
        write_atomic(dir, path, &contents).map_err(|failure| CatalogueError::WriteError {
            path: failure.path,
            message: failure.message,
        })
    }
}

/// Raw JSON representation for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCatalogue {
    version: u32,
    runbooks: Vec<RunbookRef>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogueDocument<'a> {
    version: u32,
    runbooks: &'a [RunbookRef],
}

#[cfg(test)]
mod tests {
    use cap_std::ambient_authority;
    use camino::Utf8PathBuf;
    use rstest::rstest;

    use super::*;

    const VALID_JSON: &str = r#"{
        "version": 1,
        "runbooks": [
            {"slug": "ssh-hardening", "clawScore": 94, "stepCount": 7},
            {"slug": "nginx-rate-limit", "clawScore": 88, "stepCount": 5}
        ]
    }"#;

    fn runbook(slug: &str, claw_score: u32, step_count: u32) -> RunbookRef {
        RunbookRef {
            slug: slug.to_owned(),
            claw_score,
            step_count,
        }
    }

    #[test]
    fn parses_valid_catalogue() {
        let catalogue = RunbookCatalogue::from_json(VALID_JSON).expect("valid catalogue");

        assert_eq!(catalogue.version(), 1);
        assert_eq!(catalogue.runbooks().len(), 2);
    }

    #[test]
    fn finds_runbook_by_slug() {
        let catalogue = RunbookCatalogue::from_json(VALID_JSON).expect("valid catalogue");
        let found = catalogue.find("nginx-rate-limit").expect("runbook found");

        assert_eq!(found, &runbook("nginx-rate-limit", 88, 5));
    }

    #[test]
    fn returns_error_for_unknown_slug() {
        let catalogue = RunbookCatalogue::from_json(VALID_JSON).expect("valid catalogue");

        assert_eq!(
            catalogue.find("unknown"),
            Err(CatalogueError::RunbookNotFound {
                slug: "unknown".to_owned()
            })
        );
    }

    #[rstest]
    #[case::malformed_json("not valid json")]
    #[case::missing_version(r#"{"runbooks": [{"slug": "a", "clawScore": 1, "stepCount": 1}]}"#)]
    #[case::missing_score(r#"{"version": 1, "runbooks": [{"slug": "a", "stepCount": 1}]}"#)]
    fn rejects_json_with_parse_error(#[case] json: &str) {
        let result = RunbookCatalogue::from_json(json);
        assert!(matches!(result, Err(CatalogueError::ParseError { .. })));
    }

    #[rstest]
    #[case::unsupported_version(
        r#"{"version": 2, "runbooks": [{"slug": "a", "clawScore": 1, "stepCount": 1}]}"#,
        CatalogueError::UnsupportedVersion { expected: 1, actual: 2 }
    )]
    #[case::empty_runbooks(r#"{"version": 1, "runbooks": []}"#, CatalogueError::EmptyRunbooks)]
    #[case::invalid_slug(
        r#"{"version": 1, "runbooks": [{"slug": "SSH Hardening", "clawScore": 1, "stepCount": 1}]}"#,
        CatalogueError::InvalidSlug { index: 0, value: "SSH Hardening".to_owned() }
    )]
    #[case::score_too_high(
        r#"{"version": 1, "runbooks": [{"slug": "a", "clawScore": 101, "stepCount": 1}]}"#,
        CatalogueError::ScoreOutOfRange { slug: "a".to_owned(), score: 101 }
    )]
    #[case::no_steps(
        r#"{"version": 1, "runbooks": [{"slug": "a", "clawScore": 50, "stepCount": 0}]}"#,
        CatalogueError::NoSteps { slug: "a".to_owned() }
    )]
    #[case::duplicate_slug(
        r#"{"version": 1, "runbooks": [
            {"slug": "a", "clawScore": 50, "stepCount": 2},
            {"slug": "a", "clawScore": 60, "stepCount": 3}
        ]}"#,
        CatalogueError::DuplicateSlug { slug: "a".to_owned() }
    )]
    fn rejects_invalid_catalogue(#[case] json: &str, #[case] expected: CatalogueError) {
        assert_eq!(RunbookCatalogue::from_json(json), Err(expected));
    }

    #[test]
    fn append_validates_like_parsing() {
        let mut catalogue = RunbookCatalogue::from_json(VALID_JSON).expect("valid catalogue");

        catalogue
            .append(runbook("docker-socket-exposure", 90, 4))
            .expect("appended");
        assert_eq!(catalogue.runbooks().len(), 3);
        assert_eq!(
            catalogue.append(runbook("ssh-hardening", 90, 4)),
            Err(CatalogueError::DuplicateSlug {
                slug: "ssh-hardening".to_owned()
            })
        );
        assert_eq!(
            catalogue.append(runbook("bad slug", 90, 4)),
            Err(CatalogueError::InvalidSlug {
                index: 3,
                value: "bad slug".to_owned()
            })
        );
    }

    #[test]
    fn written_catalogue_round_trips_through_a_file() {
        let dir_path = Utf8PathBuf::from("target")
            .join("seeded-sim-tests")
            .join(format!("catalogue-{}", std::process::id()));
        let root = Dir::open_ambient_dir(".", ambient_authority()).expect("open crate dir");
        root.create_dir_all(&dir_path).expect("create dir");
        let dir = root.open_dir(&dir_path).expect("open dir");
        let path = Utf8Path::new("runbooks.json");

        let mut catalogue = RunbookCatalogue::from_json(VALID_JSON).expect("valid catalogue");
        catalogue
            .append(runbook("tls-renewal", 99, 6))
            .expect("appended");
        catalogue.write_to_file(&dir, path).expect("written");

        let reloaded = RunbookCatalogue::from_file(&dir, path).expect("reloaded");
        assert_eq!(reloaded, catalogue);
    }

    #[test]
    fn missing_file_reports_io_error() {
        let root = Dir::open_ambient_dir(".", ambient_authority()).expect("open crate dir");
        let result = RunbookCatalogue::from_file(&root, Utf8Path::new("no-such-catalogue.json"));
        assert!(matches!(result, Err(CatalogueError::IoError { .. })));
    }
}
