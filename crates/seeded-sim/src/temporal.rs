//! Runbook evolution history.
//!
//! Builds a reproducible timeline of three to six versions for a runbook from
//! its slug, score, and step count. The timeline is simulated content: no
//! version store exists behind it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::derive::{derive_count, derive_enum, discriminate};
use crate::error::DerivationError;

const MIN_VERSIONS: u32 = 3;
const MAX_VERSIONS: u32 = 6;
const SCORE_FLOOR: u32 = 80;
const SCORE_CEILING: u32 = 100;
const SCORE_STEP: u32 = 4;
const MIN_STEPS: u32 = 3;
const GENESIS_REASON: &str = "Initial publication, ClawGuru genesis release";

/// Minimal description of a runbook used by the simulations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunbookRef {
    /// URL slug of the runbook.
    pub slug: String,
    /// Current quality score in `0..=100`.
    pub claw_score: u32,
    /// Number of steps in the current version.
    pub step_count: u32,
}

/// Position of a version in the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionBadge {
    /// First published version.
    Original,
    /// Intermediate revision.
    Evolved,
    /// Latest revision.
    Current,
}

/// Kind of change a diff line describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    /// Content was added.
    Added,
    /// Content was changed.
    Changed,
    /// Content was removed.
    Removed,
}

/// One line of a version diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalDiff {
    /// What happened.
    pub kind: DiffKind,
    /// Human-readable description.
    pub label: String,
}

/// A single point in a runbook's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalVersion {
    /// Version label such as `v0.3`.
    pub version: String,
    /// Quarter label such as `2025-Q3`.
    pub quarter: String,
    /// Display title.
    pub label: String,
    /// First day of the quarter.
    pub timestamp: NaiveDate,
    /// Why the version exists.
    pub mutation_reason: String,
    /// Position in the timeline.
    pub badge: VersionBadge,
    /// Score at this version, at most 100.
    pub score: u32,
    /// Changes relative to the previous version; empty for the original.
    pub diffs: Vec<TemporalDiff>,
    /// Step count at this version, at least 3.
    pub step_count: u32,
}

/// Full timeline of a runbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalHistory {
    /// Slug the history belongs to.
    pub slug: String,
    /// Number of versions after the original.
    pub total_evolutions: u32,
    /// Label of the latest version.
    pub current_version: String,
    /// Versions, oldest first.
    pub versions: Vec<TemporalVersion>,
}

struct QuarterSlot {
    label: &'static str,
    year: i32,
    month: u32,
}

const QUARTERS: [QuarterSlot; 6] = [
    QuarterSlot { label: "2025-Q1", year: 2025, month: 3 },
    QuarterSlot { label: "2025-Q2", year: 2025, month: 6 },
    QuarterSlot { label: "2025-Q3", year: 2025, month: 9 },
    QuarterSlot { label: "2025-Q4", year: 2025, month: 12 },
    QuarterSlot { label: "2026-Q1", year: 2026, month: 3 },
    QuarterSlot { label: "2026-Q2", year: 2026, month: 6 },
];

const VERSION_LABELS: [&str; 6] = ["v0.1", "v0.3", "v0.5", "v0.7", "v0.9", "v1.0"];

const MUTATION_REASONS: [&str; 14] = [
    "CVE-2025-1234 patch: SSH key exchange hardening applied",
    "OWASP Top 10 2025 update: A02 cryptographic failures addressed",
    "CIS Benchmark v8 alignment: new baseline controls added",
    "Best practice update: zero trust network access integrated",
    "Incident postmortem integration: lessons from 47 real incidents",
    "CVE-2025-7891: TLS 1.0/1.1 deprecation enforced",
    "NIST SP 800-190 rev. 2: container security controls updated",
    "CVE-2026-0023: supply chain integrity verification added",
    "Community contribution: 3 improved commands from field engineers",
    "Quality gate 2.0 upgrade: auto-improved to Claw Certified Gold",
    "CVE-2026-1337: privilege escalation vector mitigated",
    "CISA KEV update: known exploited vulnerability guidance added",
    "Regulatory alignment: SOC 2 Type II evidence mapping added",
    "Assisted rewrite: all code blocks hardened",
];

const DIFF_SETS: [&[(DiffKind, &str)]; 6] = [
    &[
        (DiffKind::Added, "Step: enable automatic security updates"),
        (DiffKind::Changed, "Firewall rule tightened to deny-by-default"),
    ],
    &[
        (DiffKind::Added, "CVE mitigation commands in step 3"),
        (DiffKind::Added, "Callout: deprecation warning for TLS 1.1"),
        (DiffKind::Changed, "Security score improved from 84 to 93"),
    ],
    &[
        (DiffKind::Changed, "Code block updated to current CLI flags"),
        (DiffKind::Added, "FAQ: how to verify patch application"),
        (DiffKind::Removed, "Outdated workaround for legacy systems"),
    ],
    &[
        (DiffKind::Added, "Step: rotate credentials after patch"),
        (DiffKind::Changed, "Alignment with NIST SP 800-190 rev. 2"),
        (DiffKind::Added, "Callout: CISA known exploited vulnerability alert"),
    ],
    &[
        (DiffKind::Added, "Zero trust verification step added"),
        (DiffKind::Changed, "Upgraded to Claw Certified Gold standard"),
    ],
    &[
        (DiffKind::Added, "Step: validate supply chain integrity (SBOM)"),
        (DiffKind::Changed, "Hardened code examples"),
        (DiffKind::Added, "Community patch: improved key rotation commands"),
    ],
];

/// Quarter labels in chronological order.
#[must_use]
pub fn quarter_labels() -> impl Iterator<Item = &'static str> {
    QUARTERS.iter().map(|slot| slot.label)
}

/// First day of the month that anchors `quarter`, if the quarter is known.
#[must_use]
pub fn quarter_start(quarter: &str) -> Option<NaiveDate> {
    QUARTERS
        .iter()
        .find(|slot| slot.label == quarter)
        .and_then(|slot| NaiveDate::from_ymd_opt(slot.year, slot.month, 1))
}

/// Generates the evolution history of `runbook`.
///
/// The version count, mutation reasons, diff sets, and score jitter come
/// from seeds discriminated off the slug, so each is independent of the
/// others.
///
/// # Errors
///
/// Returns [`DerivationError`] only if the fixed tables were emptied.
///
/// # Examples
///
/// ```
/// use seeded_sim::{RunbookRef, temporal_history};
///
/// let runbook = RunbookRef {
///     slug: "ssh-hardening".to_owned(),
///     claw_score: 94,
///     step_count: 7,
/// };
/// let history = temporal_history(&runbook).expect("fixed tables are non-empty");
/// assert!((3..=6).contains(&history.versions.len()));
/// ```
pub fn temporal_history(runbook: &RunbookRef) -> Result<TemporalHistory, DerivationError> {
    let slug = runbook.slug.as_str();
    let version_count = derive_count(&discriminate(slug, "versions"), MIN_VERSIONS, MAX_VERSIONS)?;
    let last = version_count.saturating_sub(1);
    let base_score = runbook
        .claw_score
        .saturating_sub(last.saturating_mul(SCORE_STEP))
        .max(SCORE_FLOOR);

    let mut versions = Vec::new();
    for (index, (quarter, version)) in (0..version_count).zip(QUARTERS.iter().zip(VERSION_LABELS)) {
        versions.push(build_version(
            runbook, index, last, base_score, quarter, version,
        )?);
    }
    let current_version = versions
        .last()
        .map(|v| v.version.clone())
        .unwrap_or_default();

    debug!(slug, version_count, %current_version, "generated temporal history");

    Ok(TemporalHistory {
        slug: runbook.slug.clone(),
        total_evolutions: last,
        current_version,
        versions,
    })
}

fn build_version(
    runbook: &RunbookRef,
    index: u32,
    last: u32,
    base_score: u32,
    quarter: &QuarterSlot,
    version: &str,
) -> Result<TemporalVersion, DerivationError> {
    let slug = runbook.slug.as_str();
    let step_count = runbook
        .step_count
        .saturating_sub(last.saturating_sub(index))
        .max(MIN_STEPS);
    let timestamp = NaiveDate::from_ymd_opt(quarter.year, quarter.month, 1).unwrap_or_default();

    if index == 0 {
        return Ok(TemporalVersion {
            version: version.to_owned(),
            quarter: quarter.label.to_owned(),
            label: "Original".to_owned(),
            timestamp,
            mutation_reason: GENESIS_REASON.to_owned(),
            badge: VersionBadge::Original,
            score: base_score,
            diffs: Vec::new(),
            step_count,
        });
    }

    let version_seed = discriminate(slug, &format!("version:{index}"));
    let reason = derive_enum(&discriminate(&version_seed, "reason"), &MUTATION_REASONS)?;
    let diff_set = derive_enum(&discriminate(&version_seed, "diff"), &DIFF_SETS)?;
    let jitter = derive_count(&discriminate(&version_seed, "score"), 0, 2)?;
    let score = base_score
        .saturating_add(index.saturating_mul(SCORE_STEP))
        .saturating_add(jitter)
        .min(SCORE_CEILING);
    let is_current = index == last;

    Ok(TemporalVersion {
        version: version.to_owned(),
        quarter: quarter.label.to_owned(),
        label: if is_current {
            format!("Evolution {version} (current)")
        } else {
            format!("Evolution {version}")
        },
        timestamp,
        mutation_reason: (*reason).to_owned(),
        badge: if is_current {
            VersionBadge::Current
        } else {
            VersionBadge::Evolved
        },
        score,
        diffs: diff_set
            .iter()
            .map(|(kind, label)| TemporalDiff {
                kind: *kind,
                label: (*label).to_owned(),
            })
            .collect(),
        step_count,
    })
}

/// Looks up the version in effect at `quarter`.
///
/// Returns the exact match if one exists, else the latest version whose
/// quarter sorts before `quarter`, else the first version. Returns `None`
/// only for a history without versions.
#[must_use]
pub fn find_version_by_quarter<'a>(
    history: &'a TemporalHistory,
    quarter: &str,
) -> Option<&'a TemporalVersion> {
    history
        .versions
        .iter()
        .find(|v| v.quarter == quarter)
        .or_else(|| {
            history
                .versions
                .iter()
                .rev()
                .find(|v| v.quarter.as_str() <= quarter)
        })
        .or_else(|| history.versions.first())
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn runbook() -> RunbookRef {
        RunbookRef {
            slug: "aws-hardening-2026".to_owned(),
            claw_score: 96,
            step_count: 8,
        }
    }

    fn history_for(runbook: &RunbookRef) -> TemporalHistory {
        temporal_history(runbook).expect("history")
    }

    #[rstest]
    fn history_is_stable(runbook: RunbookRef) {
        assert_eq!(history_for(&runbook), history_for(&runbook));
    }

    #[rstest]
    #[case("ssh-hardening", 40, 1)]
    #[case("nginx-rate-limit", 100, 12)]
    #[case("k8s-rbac-least-privilege", 87, 5)]
    #[case("x", 0, 0)]
    fn versions_respect_documented_bounds(
        #[case] slug: &str,
        #[case] claw_score: u32,
        #[case] step_count: u32,
    ) {
        let history = history_for(&RunbookRef {
            slug: slug.to_owned(),
            claw_score,
            step_count,
        });
        let count = history.versions.len();
        assert!((3..=6).contains(&count));
        assert_eq!(usize::try_from(history.total_evolutions).expect("small"), count - 1);
        for version in &history.versions {
            assert!(version.score <= 100);
            assert!(version.score >= 80);
            assert!(version.step_count >= 3);
        }
    }

    #[rstest]
    fn badges_mark_first_and_last(runbook: RunbookRef) {
        let history = history_for(&runbook);
        let badges: Vec<_> = history.versions.iter().map(|v| v.badge).collect();

        assert_eq!(badges.first(), Some(&VersionBadge::Original));
        assert_eq!(badges.last(), Some(&VersionBadge::Current));
        assert!(badges
            .iter()
            .skip(1)
            .take(badges.len() - 2)
            .all(|b| *b == VersionBadge::Evolved));
        let last = history.versions.last().expect("versions");
        assert_eq!(history.current_version, last.version);
        assert!(last.label.ends_with("(current)"));
    }

    #[rstest]
    fn original_version_has_no_diffs(runbook: RunbookRef) {
        let history = history_for(&runbook);
        let original = history.versions.first().expect("versions");

        assert!(original.diffs.is_empty());
        assert_eq!(original.label, "Original");
        assert_eq!(original.quarter, "2025-Q1");
        assert_eq!(original.timestamp, quarter_start("2025-Q1").expect("known"));
        assert!(history.versions.iter().skip(1).all(|v| !v.diffs.is_empty()));
    }

    #[rstest]
    fn latest_version_keeps_the_current_step_count(runbook: RunbookRef) {
        let history = history_for(&runbook);
        assert_eq!(history.versions.last().map(|v| v.step_count), Some(8));
    }

    #[rstest]
    fn quarters_follow_the_fixed_calendar(runbook: RunbookRef) {
        let history = history_for(&runbook);
        let expected: Vec<&str> = quarter_labels().take(history.versions.len()).collect();
        let actual: Vec<&str> = history.versions.iter().map(|v| v.quarter.as_str()).collect();
        assert_eq!(actual, expected);
    }

    #[rstest]
    fn finds_exact_quarter(runbook: RunbookRef) {
        let history = history_for(&runbook);
        let found = find_version_by_quarter(&history, "2025-Q2").expect("found");
        assert_eq!(found.quarter, "2025-Q2");
    }

    #[rstest]
    fn falls_back_to_latest_earlier_quarter(runbook: RunbookRef) {
        let history = history_for(&runbook);
        let found = find_version_by_quarter(&history, "2030-Q4").expect("found");
        assert_eq!(Some(found), history.versions.last());
    }

    #[rstest]
    fn falls_back_to_first_version_for_early_quarters(runbook: RunbookRef) {
        let history = history_for(&runbook);
        let found = find_version_by_quarter(&history, "2019-Q1").expect("found");
        assert_eq!(Some(found), history.versions.first());
    }

    #[test]
    fn empty_history_has_no_version() {
        let history = TemporalHistory {
            slug: "empty".to_owned(),
            total_evolutions: 0,
            current_version: String::new(),
            versions: Vec::new(),
        };
        assert!(find_version_by_quarter(&history, "2025-Q1").is_none());
    }

    #[test]
    fn unknown_quarter_has_no_start() {
        assert!(quarter_start("2024-Q4").is_none());
        assert_eq!(
            quarter_start("2026-Q2"),
            NaiveDate::from_ymd_opt(2026, 6, 1)
        );
    }

    #[test]
    fn runbook_ref_deserialises_camel_case() {
        let parsed: RunbookRef =
            serde_json::from_str(r#"{"slug":"ssh","clawScore":90,"stepCount":4}"#)
                .expect("parse");
        assert_eq!(parsed.claw_score, 90);
        assert_eq!(parsed.step_count, 4);
    }
}
