//! Template-based record assembly.
//!
//! A record combines one template picked from a fixed list with fields
//! derived independently from the same base seed: zone, severity, and an
//! offset-deterministic timestamp. Each field draws on its own discriminated
//! seed.

use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

use crate::derive::{derive_enum, discriminate, offset_timestamp};
use crate::error::DerivationError;
use crate::ident::make_id;

/// Number of sanitised seed characters kept in record identifiers.
const RECORD_ID_SEED_LENGTH: usize = 12;

/// Closed set of severities a simulated record can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Immediate action required.
    Critical,
    /// Action required soon.
    High,
    /// Worth scheduling.
    Medium,
    /// Informational.
    Low,
}

impl Severity {
    /// Every severity, most severe first.
    pub const ALL: [Self; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];
}

/// A fixed issue/resolution pair that records are built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordTemplate {
    /// What the simulation claims went wrong.
    pub issue: &'static str,
    /// How the simulation claims it was resolved.
    pub resolution: &'static str,
}

/// Inputs shared by every record assembled for one feature.
#[derive(Debug, Clone, Copy)]
pub struct RecordSpec<'a> {
    /// Identifier prefix, for example `evt`.
    pub prefix: &'a str,
    /// Templates to choose from.
    pub templates: &'a [RecordTemplate],
    /// Zones to choose from.
    pub zones: &'a [&'a str],
    /// Largest distance of the record timestamp from now.
    pub max_offset: TimeDelta,
}

/// A simulated record assembled from a template and derived fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimRecord {
    /// Stable identifier derived from the seed.
    pub id: String,
    /// Offset-deterministic timestamp.
    pub timestamp: DateTime<Utc>,
    /// Zone the record is attributed to.
    pub zone: String,
    /// Issue text from the selected template.
    pub issue: String,
    /// Resolution text from the selected template.
    pub resolution: String,
    /// Severity from the closed set.
    pub severity: Severity,
}

/// Assembles a record for `seed` from `spec`.
///
/// # Errors
///
/// Returns [`DerivationError::EmptyOptions`] when `spec` has no templates or
/// no zones, and [`DerivationError::InvalidRange`] for a negative
/// `max_offset`.
pub fn assemble_record(
    seed: &str,
    spec: &RecordSpec<'_>,
    clock: &dyn Clock,
) -> Result<SimRecord, DerivationError> {
    let template = derive_enum(&discriminate(seed, "template"), spec.templates)?;
    let zone = derive_enum(&discriminate(seed, "zone"), spec.zones)?;
    let severity = derive_enum(&discriminate(seed, "severity"), &Severity::ALL)?;
    let timestamp = offset_timestamp(clock, &discriminate(seed, "offset"), spec.max_offset)?;

    Ok(SimRecord {
        id: make_id(seed, spec.prefix, RECORD_ID_SEED_LENGTH),
        timestamp,
        zone: (*zone).to_owned(),
        issue: template.issue.to_owned(),
        resolution: template.resolution.to_owned(),
        severity: *severity,
    })
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;
    use crate::test_support::{FixedClock, fixture_clock};

    const TEMPLATES: [RecordTemplate; 3] = [
        RecordTemplate {
            issue: "TLS certificate expiring in 48h",
            resolution: "Certificate renewed",
        },
        RecordTemplate {
            issue: "SSH brute-force detected",
            resolution: "Source address blocked",
        },
        RecordTemplate {
            issue: "Public bucket policy",
            resolution: "Public access blocked",
        },
    ];
    const ZONES: [&str; 2] = ["fsn1-dc14", "hel1-dc2"];

    #[fixture]
    fn clock() -> FixedClock {
        fixture_clock()
    }

    fn spec() -> RecordSpec<'static> {
        RecordSpec {
            prefix: "evt",
            templates: &TEMPLATES,
            zones: &ZONES,
            max_offset: TimeDelta::minutes(2),
        }
    }

    #[rstest]
    fn assembles_fields_from_the_supplied_lists(clock: FixedClock) {
        let record = assemble_record("sw-demo:event:0", &spec(), &clock).expect("assembled");

        assert!(TEMPLATES.iter().any(|t| t.issue == record.issue
            && t.resolution == record.resolution));
        assert!(ZONES.contains(&record.zone.as_str()));
        assert!(record.id.starts_with("evt-swdemoevent"));
        assert!(clock.utc() - record.timestamp <= TimeDelta::minutes(2));
    }

    #[rstest]
    fn assembly_is_deterministic_for_a_fixed_clock(clock: FixedClock) {
        let first = assemble_record("sw-demo:event:3", &spec(), &clock).expect("assembled");
        let second = assemble_record("sw-demo:event:3", &spec(), &clock).expect("assembled");
        assert_eq!(first, second);
    }

    #[rstest]
    fn rejects_empty_template_list(clock: FixedClock) {
        let empty = RecordSpec {
            templates: &[],
            ..spec()
        };
        let err = assemble_record("seed", &empty, &clock).expect_err("no templates");
        assert_eq!(
            err,
            DerivationError::EmptyOptions {
                seed: "seed:template".to_owned()
            }
        );
    }

    #[test]
    fn severity_serialises_lowercase() {
        let json = serde_json::to_string(&Severity::ALL).expect("serialise");
        assert_eq!(json, r#"["critical","high","medium","low"]"#);
    }
}
