//! Simulated provenance chains for runbooks.
//!
//! A chain lists one event per temporal version of a runbook plus a few
//! extra events per revision. Events are linked through the digest of their
//! predecessor and summarised by a digest tree root.
//!
//! Everything here is a deterministic simulation. Digests come from a
//! non-cryptographic mixing function and seals are derived without any key,
//! so a chain demonstrates the shape of an audit trail, not its guarantees.

mod digest;

use chrono::{DateTime, NaiveTime, SecondsFormat, TimeDelta, Utc};
use mockable::Clock;
use serde::Serialize;
use tracing::debug;

pub use self::digest::{
    DIGEST_LEN, PathStep, SEAL_LEN, SiblingSide, content_digest, digest_path, digest_root,
    fold_path, simulated_seal, zero_digest,
};
use crate::derive::{derive_count, derive_enum, discriminate};
use crate::error::{DerivationError, SnapshotError};
use crate::ident::make_id;
use crate::temporal::{RunbookRef, TemporalVersion, VersionBadge, temporal_history};

const CHAIN_ID_PREFIX: &str = "prov";
const CHAIN_ID_SEED_LENGTH: usize = 16;
const EXTRA_SPACING_MINUTES: i64 = 47;
const EXPORT_SCHEMA: &str = "seeded-sim provenance simulation v1";
const SIMULATION_NOTICE: &str = "Digests and seals in this document are produced by a \
    deterministic non-cryptographic simulation. They carry no signature, key, or \
    tamper evidence.";

/// Category of a provenance event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    /// First publication.
    Genesis,
    /// A new temporal version.
    TemporalEvolution,
    /// A remediation approved from the swarm simulation.
    SwarmRemediation,
    /// A quality score improvement.
    QualityGate,
    /// A vulnerability patch.
    CvePatch,
    /// A compliance mapping update.
    ComplianceUpdate,
    /// An assisted hardening pass.
    AiHardening,
}

impl MutationKind {
    /// Kinds available for the extra events of a revision.
    pub const EXTRAS: [Self; 5] = [
        Self::SwarmRemediation,
        Self::QualityGate,
        Self::AiHardening,
        Self::ComplianceUpdate,
        Self::CvePatch,
    ];

    /// Stable snake-case name, as serialised.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Genesis => "genesis",
            Self::TemporalEvolution => "temporal_evolution",
            Self::SwarmRemediation => "swarm_remediation",
            Self::QualityGate => "quality_gate",
            Self::CvePatch => "cve_patch",
            Self::ComplianceUpdate => "compliance_update",
            Self::AiHardening => "ai_hardening",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Genesis => "Genesis: initial publication",
            Self::TemporalEvolution => "Temporal evolution: version bump",
            Self::SwarmRemediation => "Swarm remediation: approved action applied",
            Self::QualityGate => "Quality gate: score improvement",
            Self::CvePatch => "CVE patch: vulnerability mitigation",
            Self::ComplianceUpdate => "Compliance update: regulatory alignment",
            Self::AiHardening => "AI hardening: assisted rewrite",
        }
    }
}

/// One link of a provenance chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceEvent {
    /// `<chain id>-evt-NNN`.
    pub id: String,
    /// When the simulated event took place.
    pub timestamp: DateTime<Utc>,
    /// Runbook the chain belongs to.
    pub runbook_slug: String,
    /// Temporal version the event belongs to.
    pub version: String,
    /// Simulated content digest.
    pub digest: String,
    /// Digest of the preceding event, or all zeros for the first.
    pub previous_digest: String,
    /// Simulated seal over digest, predecessor, and timestamp.
    pub seal: String,
    /// Human-readable reason.
    pub reason: String,
    /// Event category.
    pub mutation: MutationKind,
    /// Position in the chain.
    pub index: usize,
    /// `EPOCH-<quarter>`.
    pub epoch: String,
}

/// A complete simulated chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceChain {
    /// Runbook the chain belongs to.
    pub runbook_slug: String,
    /// Stable chain identifier.
    pub chain_id: String,
    /// Always `true`.
    pub simulated: bool,
    /// Number of sealed events.
    pub total_seals: usize,
    /// Timestamp of the first event.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last event.
    pub updated_at: DateTime<Utc>,
    /// Events, oldest first.
    pub events: Vec<ProvenanceEvent>,
    /// Root of the digest tree over all event digests.
    pub digest_root: String,
}

/// Outcome of [`verify_chain`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainVerification {
    /// Runbook the chain belongs to.
    pub runbook_slug: String,
    /// `true` when every link holds and the root matches.
    pub valid: bool,
    /// Number of events in the chain.
    pub total_events: usize,
    /// Links verified before the first break.
    pub verified_links: usize,
    /// Index of the first event whose predecessor link is wrong.
    pub broken_at: Option<usize>,
    /// Whether the recomputed root equals the stored root.
    pub digest_root_verified: bool,
    /// Human-readable summary.
    pub message: String,
}

/// Inclusion proof for a single event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InclusionProof {
    /// Requested event identifier.
    pub event_id: String,
    /// Version of the event, or `unknown`.
    pub version: String,
    /// Digest of the event, or all zeros when unknown.
    pub digest: String,
    /// Stored root of the chain.
    pub digest_root: String,
    /// Sibling digests from leaf to root.
    pub path: Vec<PathStep>,
    /// Whether folding the path reproduces the stored root.
    pub verified: bool,
    /// Human-readable summary.
    pub message: String,
}

/// Audit-style export document for a chain.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainExport<'a> {
    /// Schema tag of the document.
    pub schema: &'static str,
    /// Statement that digests and seals are simulated.
    pub notice: &'static str,
    /// When the document was produced.
    pub generated_at: DateTime<Utc>,
    /// The exported chain.
    pub chain: &'a ProvenanceChain,
    /// Verification of the exported chain.
    pub verification: ChainVerification,
}

/// Builds the stable identifier of a runbook's chain.
#[must_use]
pub fn make_chain_id(slug: &str) -> String {
    make_id(slug, CHAIN_ID_PREFIX, CHAIN_ID_SEED_LENGTH)
}

/// Generates the simulated provenance chain of `runbook`.
///
/// The chain does not depend on the current time: event timestamps are
/// anchored to the start of each version's quarter.
///
/// # Errors
///
/// Returns [`DerivationError`] only if the fixed tables were emptied.
///
/// # Examples
///
/// ```
/// use seeded_sim::RunbookRef;
/// use seeded_sim::provenance::{generate_chain, verify_chain};
///
/// let runbook = RunbookRef {
///     slug: "ssh-hardening".to_owned(),
///     claw_score: 94,
///     step_count: 7,
/// };
/// let chain = generate_chain(&runbook).expect("fixed tables are non-empty");
/// assert!(verify_chain(&chain).valid);
/// ```
pub fn generate_chain(runbook: &RunbookRef) -> Result<ProvenanceChain, DerivationError> {
    let history = temporal_history(runbook)?;
    let chain_id = make_chain_id(&runbook.slug);
    let mut builder = ChainBuilder {
        chain_id: &chain_id,
        slug: &runbook.slug,
        events: Vec::new(),
        previous: zero_digest(),
    };

    for (position, version) in history.versions.iter().enumerate() {
        let base = version.timestamp.and_time(NaiveTime::MIN).and_utc();
        let epoch = format!("EPOCH-{}", version.quarter);
        let mutation = if version.badge == VersionBadge::Original {
            MutationKind::Genesis
        } else {
            MutationKind::TemporalEvolution
        };
        let digest = content_digest(&format!(
            "{}:{}:{}:{position}",
            runbook.slug, version.version, version.mutation_reason
        ));
        builder.push(PendingEvent {
            version,
            timestamp: base,
            digest,
            reason: version.mutation_reason.clone(),
            mutation,
            epoch: &epoch,
        });

        if version.badge != VersionBadge::Original {
            push_extras(&mut builder, &runbook.slug, position, version, base, &epoch)?;
        }
    }

    let digests: Vec<String> = builder.events.iter().map(|e| e.digest.clone()).collect();
    let events = builder.events;
    let created_at = events.first().map(|e| e.timestamp).unwrap_or_default();
    let updated_at = events.last().map(|e| e.timestamp).unwrap_or_default();

    debug!(
        slug = %runbook.slug,
        %chain_id,
        events = events.len(),
        "generated provenance chain"
    );

    Ok(ProvenanceChain {
        runbook_slug: runbook.slug.clone(),
        chain_id,
        simulated: true,
        total_seals: events.len(),
        created_at,
        updated_at,
        events,
        digest_root: digest_root(&digests),
    })
}

struct PendingEvent<'a> {
    version: &'a TemporalVersion,
    timestamp: DateTime<Utc>,
    digest: String,
    reason: String,
    mutation: MutationKind,
    epoch: &'a str,
}

struct ChainBuilder<'a> {
    chain_id: &'a str,
    slug: &'a str,
    events: Vec<ProvenanceEvent>,
    previous: String,
}

impl ChainBuilder<'_> {
    fn push(&mut self, pending: PendingEvent<'_>) {
        let index = self.events.len();
        let seal = simulated_seal(
            &pending.digest,
            &self.previous,
            &pending.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        );
        let previous_digest = std::mem::replace(&mut self.previous, pending.digest.clone());
        self.events.push(ProvenanceEvent {
            id: format!("{}-evt-{index:03}", self.chain_id),
            timestamp: pending.timestamp,
            runbook_slug: self.slug.to_owned(),
            version: pending.version.version.clone(),
            digest: pending.digest,
            previous_digest,
            seal,
            reason: pending.reason,
            mutation: pending.mutation,
            index,
            epoch: pending.epoch.to_owned(),
        });
    }
}

fn extra_reasons(version: &TemporalVersion) -> [String; 5] {
    let remediation = version
        .diffs
        .first()
        .map_or("security hardening applied", |diff| diff.label.as_str());
    let cve = version
        .mutation_reason
        .split(':')
        .next()
        .unwrap_or_default()
        .trim();
    [
        format!("Approved swarm action: {remediation}"),
        format!("Quality gate: claw score improved to {}/100", version.score),
        format!("Assisted hardening pass completed for {}", version.version),
        "SOC 2 / ISO 27001 compliance mapping updated".to_owned(),
        format!("CVE patch integrated: {cve}"),
    ]
}

fn push_extras(
    builder: &mut ChainBuilder<'_>,
    slug: &str,
    position: usize,
    version: &TemporalVersion,
    base: DateTime<Utc>,
    epoch: &str,
) -> Result<(), DerivationError> {
    let version_seed = discriminate(slug, &format!("provenance:{position}"));
    let extra_count = derive_count(&discriminate(&version_seed, "extras"), 1, 3)?;
    let reasons = extra_reasons(version);

    for extra in 0..extra_count {
        let extra_seed = discriminate(&version_seed, &format!("extra:{extra}"));
        let mutation = *derive_enum(&discriminate(&extra_seed, "kind"), &MutationKind::EXTRAS)?;
        let reason = derive_enum(&discriminate(&extra_seed, "reason"), &reasons)?.clone();
        let jitter = derive_count(&discriminate(&extra_seed, "minute"), 0, 59)?;
        let minutes = i64::from(extra)
            .saturating_add(1)
            .saturating_mul(EXTRA_SPACING_MINUTES)
            .saturating_add(i64::from(jitter));
        let timestamp = base
            .checked_add_signed(TimeDelta::minutes(minutes))
            .unwrap_or(base);
        let digest = content_digest(&format!(
            "{slug}:{}:extra{extra}:{}:{position}",
            version.version,
            mutation.as_str()
        ));
        builder.push(PendingEvent {
            version,
            timestamp,
            digest,
            reason,
            mutation,
            epoch,
        });
    }
    Ok(())
}

/// Checks the predecessor links and the digest root of `chain`.
#[must_use]
pub fn verify_chain(chain: &ProvenanceChain) -> ChainVerification {
    let zero = zero_digest();
    let mut expected_previous = zero.as_str();
    let mut verified_links = 0;
    let mut broken_at = None;

    for (index, event) in chain.events.iter().enumerate() {
        if event.previous_digest != expected_previous {
            broken_at = Some(index);
            break;
        }
        verified_links += 1;
        expected_previous = event.digest.as_str();
    }

    let digests: Vec<String> = chain.events.iter().map(|e| e.digest.clone()).collect();
    let digest_root_verified = digest_root(&digests) == chain.digest_root;
    let valid = broken_at.is_none() && digest_root_verified;
    let message = match (broken_at, digest_root_verified) {
        (None, true) => format!(
            "chain {} verified: {} events, all links intact, digest root matches",
            chain.chain_id,
            chain.events.len()
        ),
        (Some(index), _) => format!(
            "chain {} broken at event index {index}",
            chain.chain_id
        ),
        (None, false) => format!("chain {} digest root mismatch", chain.chain_id),
    };

    ChainVerification {
        runbook_slug: chain.runbook_slug.clone(),
        valid,
        total_events: chain.events.len(),
        verified_links,
        broken_at,
        digest_root_verified,
        message,
    }
}

/// Builds the inclusion proof of `event_id` in `chain`.
///
/// An unknown identifier yields an unverified proof with an empty path.
#[must_use]
pub fn inclusion_proof(chain: &ProvenanceChain, event_id: &str) -> InclusionProof {
    let digests: Vec<String> = chain.events.iter().map(|e| e.digest.clone()).collect();
    let found = chain
        .events
        .iter()
        .enumerate()
        .find(|(_, event)| event.id == event_id)
        .and_then(|(position, event)| {
            digest_path(&digests, position).map(|path| (event, path))
        });

    let Some((event, path)) = found else {
        return InclusionProof {
            event_id: event_id.to_owned(),
            version: "unknown".to_owned(),
            digest: zero_digest(),
            digest_root: chain.digest_root.clone(),
            path: Vec::new(),
            verified: false,
            message: format!("event {event_id} not found in chain {}", chain.chain_id),
        };
    };

    let verified = fold_path(&event.digest, &path) == chain.digest_root;
    let message = if verified {
        format!(
            "event {event_id} ({}) is included in chain {}",
            event.version, chain.chain_id
        )
    } else {
        format!("inclusion proof for event {event_id} does not reproduce the digest root")
    };

    InclusionProof {
        event_id: event_id.to_owned(),
        version: event.version.clone(),
        digest: event.digest.clone(),
        digest_root: chain.digest_root.clone(),
        path,
        verified,
        message,
    }
}

/// Renders `chain` and its verification as pretty JSON.
///
/// The document carries a schema tag, a notice that its digests and seals
/// are simulated, and the generation time read from `clock`.
///
/// # Errors
///
/// Returns [`SnapshotError::Serialisation`] when JSON encoding fails.
pub fn export_chain_json(
    chain: &ProvenanceChain,
    clock: &dyn Clock,
) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string_pretty(&export_document(chain, clock))?)
}

/// Builds the export document of `chain` stamped with the time from `clock`.
#[must_use]
pub fn export_document<'a>(chain: &'a ProvenanceChain, clock: &dyn Clock) -> ChainExport<'a> {
    ChainExport {
        schema: EXPORT_SCHEMA,
        notice: SIMULATION_NOTICE,
        generated_at: clock.utc(),
        chain,
        verification: verify_chain(chain),
    }
}

#[cfg(test)]
mod tests {
    //! Covers chain shape, linking, verification, and proofs.

    use std::collections::HashSet;

    use rstest::{fixture, rstest};

    use super::*;
    use crate::test_support::fixture_clock;

    #[fixture]
    fn runbook() -> RunbookRef {
        RunbookRef {
            slug: "nginx-rate-limit".to_owned(),
            claw_score: 91,
            step_count: 6,
        }
    }

    #[fixture]
    fn chain(runbook: RunbookRef) -> ProvenanceChain {
        generate_chain(&runbook).expect("chain")
    }

    #[rstest]
    fn chain_is_stable(runbook: RunbookRef, chain: ProvenanceChain) {
        assert_eq!(generate_chain(&runbook).expect("chain"), chain);
    }

    #[rstest]
    fn chain_starts_with_genesis_and_links_each_event(chain: ProvenanceChain) {
        let first = chain.events.first().expect("events");
        assert_eq!(first.mutation, MutationKind::Genesis);
        assert_eq!(first.previous_digest, zero_digest());

        for pair in chain.events.windows(2) {
            let [earlier, later] = pair else {
                panic!("window of two");
            };
            assert_eq!(later.previous_digest, earlier.digest);
            assert!(later.timestamp >= earlier.timestamp);
        }
        assert_eq!(chain.total_seals, chain.events.len());
        assert_eq!(Some(chain.created_at), chain.events.first().map(|e| e.timestamp));
        assert_eq!(Some(chain.updated_at), chain.events.last().map(|e| e.timestamp));
    }

    #[rstest]
    fn each_revision_has_one_to_three_extras(runbook: RunbookRef, chain: ProvenanceChain) {
        let history = temporal_history(&runbook).expect("history");
        for version in history.versions.iter().skip(1) {
            let count = chain
                .events
                .iter()
                .filter(|e| e.version == version.version)
                .count();
            assert!((2..=4).contains(&count), "{} has {count} events", version.version);
        }
    }

    #[rstest]
    fn events_carry_well_formed_fields(chain: ProvenanceChain) {
        let ids: HashSet<&str> = chain.events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids.len(), chain.events.len());
        assert!(chain.chain_id.starts_with("prov-nginxratelimit-"));
        for (index, event) in chain.events.iter().enumerate() {
            assert_eq!(event.index, index);
            assert_eq!(event.id, format!("{}-evt-{index:03}", chain.chain_id));
            assert_eq!(event.digest.len(), DIGEST_LEN);
            assert_eq!(event.seal.len(), SEAL_LEN);
            assert!(event.epoch.starts_with("EPOCH-20"));
        }
    }

    #[rstest]
    fn generated_chain_verifies(chain: ProvenanceChain) {
        let report = verify_chain(&chain);
        assert!(report.valid);
        assert_eq!(report.verified_links, chain.events.len());
        assert_eq!(report.broken_at, None);
        assert!(report.digest_root_verified);
    }

    #[rstest]
    fn tampered_link_is_reported(mut chain: ProvenanceChain) {
        if let Some(event) = chain.events.get_mut(2) {
            event.previous_digest = content_digest("forged");
        }
        let report = verify_chain(&chain);
        assert!(!report.valid);
        assert_eq!(report.broken_at, Some(2));
        assert_eq!(report.verified_links, 2);
    }

    #[rstest]
    fn tampered_root_is_reported(mut chain: ProvenanceChain) {
        chain.digest_root = zero_digest();
        let report = verify_chain(&chain);
        assert!(!report.valid);
        assert_eq!(report.broken_at, None);
        assert!(!report.digest_root_verified);
    }

    #[rstest]
    fn every_event_has_a_verified_proof(chain: ProvenanceChain) {
        for event in &chain.events {
            let proof = inclusion_proof(&chain, &event.id);
            assert!(proof.verified, "{}", proof.message);
            assert_eq!(proof.digest, event.digest);
        }
    }

    #[rstest]
    fn unknown_event_yields_unverified_proof(chain: ProvenanceChain) {
        let proof = inclusion_proof(&chain, "prov-missing-evt-999");
        assert!(!proof.verified);
        assert!(proof.path.is_empty());
        assert_eq!(proof.version, "unknown");
        assert_eq!(proof.digest, zero_digest());
    }

    #[rstest]
    fn export_labels_the_simulation(chain: ProvenanceChain) {
        let json = export_chain_json(&chain, &fixture_clock()).expect("export");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");

        assert_eq!(value.get("schema").and_then(|v| v.as_str()), Some(EXPORT_SCHEMA));
        assert!(value
            .get("notice")
            .and_then(|v| v.as_str())
            .is_some_and(|notice| notice.contains("non-cryptographic")));
        assert_eq!(
            value.get("generatedAt").and_then(|v| v.as_str()),
            Some("2026-03-01T09:30:00Z")
        );
        assert_eq!(
            value.pointer("/verification/valid").and_then(serde_json::Value::as_bool),
            Some(true)
        );
        assert_eq!(
            value.pointer("/chain/simulated").and_then(serde_json::Value::as_bool),
            Some(true)
        );
    }

    #[rstest]
    #[case(MutationKind::Genesis, "Genesis: initial publication")]
    #[case(MutationKind::CvePatch, "CVE patch: vulnerability mitigation")]
    fn mutation_labels(#[case] kind: MutationKind, #[case] label: &str) {
        assert_eq!(kind.label(), label);
    }

    #[test]
    fn mutation_kinds_serialise_snake_case() {
        let json = serde_json::to_string(&MutationKind::SwarmRemediation).expect("serialise");
        assert_eq!(json, r#""swarm_remediation""#);
    }

    #[rstest]
    #[case(MutationKind::Genesis)]
    #[case(MutationKind::TemporalEvolution)]
    #[case(MutationKind::SwarmRemediation)]
    #[case(MutationKind::QualityGate)]
    #[case(MutationKind::CvePatch)]
    #[case(MutationKind::ComplianceUpdate)]
    #[case(MutationKind::AiHardening)]
    fn mutation_names_match_their_serialised_form(#[case] kind: MutationKind) {
        let json = serde_json::to_value(kind).expect("serialise");
        assert_eq!(json.as_str(), Some(kind.as_str()));
    }

    #[rstest]
    fn extra_event_digests_use_the_mutation_name(runbook: RunbookRef, chain: ProvenanceChain) {
        let history = temporal_history(&runbook).expect("history");
        let version = history.versions.get(1).expect("at least one revision");
        let first_extra = chain
            .events
            .iter()
            .filter(|e| e.version == version.version)
            .nth(1)
            .expect("each revision has an extra event");

        let expected = content_digest(&format!(
            "{}:{}:extra0:{}:1",
            runbook.slug,
            version.version,
            first_extra.mutation.as_str()
        ));

        assert_eq!(first_extra.digest, expected);
    }
}
