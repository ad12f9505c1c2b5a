//! Swarm deployment simulation.
//!
//! Produces a stable, reproducible snapshot of a fictitious fleet of
//! self-healing agents for a runbook. No infrastructure is contacted or
//! modified: every count, status, and event below is derived from the
//! deployment identifier and runbook slug, and the output carries
//! `simulated: true` so consumers cannot mistake it for telemetry.
//!
//! Heal events carry positional identifiers, `evt-<short id>-<position>`,
//! rather than the seed-derived id [`assemble_record`] produces. Positions
//! count from the newest event, so identifiers stay readable on the page and
//! stay stable for a deployment.

use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::derive::{
    derive_count, derive_enum, derive_index, derive_list, discriminate, offset_timestamp,
};
use crate::error::DerivationError;
use crate::ident::{make_id, sanitize_seed};
use crate::record::{RecordSpec, RecordTemplate, SimRecord, assemble_record};

/// Smallest simulated fleet.
pub const SWARM_AGENT_MIN: u32 = 50;

/// Largest simulated fleet.
pub const SWARM_AGENT_MAX: u32 = 500;

/// Upper bound on the agents listed individually in a snapshot.
pub const SAMPLE_AGENT_LIMIT: u32 = 20;

/// Number of heal events listed in a snapshot.
pub const RECENT_EVENT_COUNT: usize = 8;

const DEPLOYMENT_ID_PREFIX: &str = "sw";
const DEPLOYMENT_ID_SEED_LENGTH: usize = 12;
const SHORT_ID_LENGTH: usize = 6;
const HEAL_RATE_MIN: u32 = 5;
const HEAL_RATE_MAX: u32 = 64;
const LOST_PERCENT: u32 = 2;
const HEALING_PERCENT: u32 = 5;
const EVENT_SPACING_MINUTES: i64 = 7;
const STATUS_BUCKETS: u32 = 20;

/// Supported (simulated) target environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetEnvironment {
    /// Kubernetes cluster.
    Kubernetes,
    /// Amazon Web Services.
    Aws,
    /// Google Cloud Platform.
    Gcp,
    /// Microsoft Azure.
    Azure,
    /// Self-hosted racks.
    OnPrem,
    /// Hetzner data centres.
    Hetzner,
}

impl TargetEnvironment {
    /// Every target, in selection order.
    pub const ALL: [Self; 6] = [
        Self::Kubernetes,
        Self::Aws,
        Self::Gcp,
        Self::Azure,
        Self::OnPrem,
        Self::Hetzner,
    ];

    /// Zone names attributed to agents in this environment.
    #[must_use]
    pub const fn zones(self) -> &'static [&'static str] {
        match self {
            Self::Kubernetes => &[
                "kube-north-1a",
                "kube-north-1b",
                "kube-south-2a",
                "kube-south-2b",
                "kube-edge-3a",
            ],
            Self::Aws => &[
                "us-east-1a",
                "us-east-1b",
                "us-west-2a",
                "eu-west-1a",
                "ap-southeast-1a",
            ],
            Self::Gcp => &[
                "us-central1-a",
                "us-central1-b",
                "europe-west1-b",
                "asia-east1-a",
                "us-east1-c",
            ],
            Self::Azure => &[
                "eastus-1",
                "eastus-2",
                "westeurope-1",
                "southeastasia-1",
                "uksouth-1",
            ],
            Self::OnPrem => &[
                "rack-A-01",
                "rack-A-02",
                "rack-B-01",
                "rack-B-02",
                "dmz-edge-01",
            ],
            Self::Hetzner => &["fsn1-dc14", "nbg1-dc3", "hel1-dc2", "ash-dc1", "sin-dc1"],
        }
    }
}

/// Status of one simulated agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Reporting normally.
    Active,
    /// Applying a fix.
    Healing,
    /// Waiting for work.
    Idle,
    /// Not reporting.
    Lost,
}

impl AgentStatus {
    /// Maps a roll in `0..20` to a status: 1/20 lost, 1/20 healing,
    /// 3/20 idle, the rest active.
    const fn from_roll(roll: u32) -> Self {
        match roll {
            0 => Self::Lost,
            1 => Self::Healing,
            2..=4 => Self::Idle,
            _ => Self::Active,
        }
    }
}

/// One agent from the listed sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwarmAgent {
    /// Agent identifier, unique within the snapshot.
    pub id: String,
    /// Current status.
    pub status: AgentStatus,
    /// Zone the agent runs in.
    pub zone: String,
    /// Last heartbeat, at most 30 seconds before now.
    pub last_seen: DateTime<Utc>,
    /// Heal actions attributed to the agent.
    pub heal_events: u32,
}

/// One entry of the recent heal log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealEvent {
    /// Assembled record fields.
    #[serde(flatten)]
    pub record: SimRecord,
    /// Sampled agent credited with the fix.
    pub agent_id: String,
}

/// Full snapshot of a simulated swarm deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwarmDeployment {
    /// Deployment identifier the snapshot was generated for.
    pub deployment_id: String,
    /// Runbook the deployment is attached to.
    pub runbook_slug: String,
    /// Always `true`; the snapshot is not telemetry.
    pub simulated: bool,
    /// Target environment.
    pub target: TargetEnvironment,
    /// Fleet size in `50..=500`.
    pub total_agents: u32,
    /// Agents neither lost nor healing.
    pub active_agents: u32,
    /// Agents currently healing (5 % of the fleet).
    pub healing_agents: u32,
    /// Agents not reporting (2 % of the fleet).
    pub lost_agents: u32,
    /// Heal events in the last hour, in `5..=64`.
    pub heal_events_this_hour: u32,
    /// Start of the deployment, at most six hours before now.
    pub started_at: DateTime<Utc>,
    /// Zones of the target environment.
    pub zones: Vec<String>,
    /// Sample of at most 20 agents.
    pub agents: Vec<SwarmAgent>,
    /// Recent heal events, newest first.
    pub recent_heal_events: Vec<HealEvent>,
}

const HEAL_TEMPLATES: [RecordTemplate; 10] = [
    RecordTemplate {
        issue: "nginx rate-limit threshold exceeded",
        resolution: "Dynamic backoff applied, rate-limit reset",
    },
    RecordTemplate {
        issue: "TLS certificate expiring in 48h",
        resolution: "Certificate auto-renewed via ACME with a 90 day extension",
    },
    RecordTemplate {
        issue: "Memory pressure on pod detected (>85%)",
        resolution: "Container OOM risk mitigated, limits adjusted",
    },
    RecordTemplate {
        issue: "SSH brute-force detected from 185.x.x.x",
        resolution: "IP blocked via iptables DROP rule",
    },
    RecordTemplate {
        issue: "Kubernetes RBAC misconfiguration found",
        resolution: "Least-privilege role binding enforced",
    },
    RecordTemplate {
        issue: "Docker socket exposed to untrusted container",
        resolution: "Socket mount revoked, container restarted",
    },
    RecordTemplate {
        issue: "CIS Benchmark deviation: world-writable /tmp",
        resolution: "Permissions hardened to 1777",
    },
    RecordTemplate {
        issue: "Unencrypted etcd endpoint exposed",
        resolution: "mTLS enforced, etcd peers re-validated",
    },
    RecordTemplate {
        issue: "S3 bucket policy allows public read",
        resolution: "Block Public Access re-applied",
    },
    RecordTemplate {
        issue: "Log4j pattern detected in JVM args",
        resolution: "JVM args sanitised, CVE-2021-44228 mitigated",
    },
];

/// Derives the target environment for a deployment.
///
/// # Errors
///
/// Never fails in practice; the target list is fixed and non-empty.
pub fn derive_target(deployment_id: &str) -> Result<TargetEnvironment, DerivationError> {
    derive_enum(&discriminate(deployment_id, "target"), &TargetEnvironment::ALL).copied()
}

/// Builds the shareable deployment identifier for a runbook slug.
///
/// # Examples
///
/// ```
/// use seeded_sim::make_deployment_id;
///
/// let id = make_deployment_id("aws-hardening-2026");
/// assert!(id.starts_with("sw-awshardening-"));
/// assert_eq!(id, make_deployment_id("aws-hardening-2026"));
/// ```
#[must_use]
pub fn make_deployment_id(slug: &str) -> String {
    make_id(slug, DEPLOYMENT_ID_PREFIX, DEPLOYMENT_ID_SEED_LENGTH)
}

/// Generates the swarm snapshot for a deployment of a runbook.
///
/// Categorical and numeric fields depend only on `deployment_id` and
/// `runbook_slug`. Timestamps are offset-deterministic relative to `clock`.
///
/// # Errors
///
/// Returns [`DerivationError`] only if the fixed tables were emptied, which
/// would be a programming error.
///
/// # Examples
///
/// ```
/// use mockable::DefaultClock;
/// use seeded_sim::{generate_swarm_deployment, make_deployment_id};
///
/// let id = make_deployment_id("ssh-hardening");
/// let snapshot = generate_swarm_deployment(&id, "ssh-hardening", &DefaultClock)
///     .expect("fixed tables are non-empty");
/// assert!((50..=500).contains(&snapshot.total_agents));
/// assert!(snapshot.simulated);
/// ```
pub fn generate_swarm_deployment(
    deployment_id: &str,
    runbook_slug: &str,
    clock: &dyn Clock,
) -> Result<SwarmDeployment, DerivationError> {
    let base = discriminate(deployment_id, runbook_slug);

    let total_agents = derive_count(
        &discriminate(&base, "agents"),
        SWARM_AGENT_MIN,
        SWARM_AGENT_MAX,
    )?;
    let lost_agents = percent_of(total_agents, LOST_PERCENT);
    let healing_agents = percent_of(total_agents, HEALING_PERCENT);
    let active_agents = total_agents
        .saturating_sub(lost_agents)
        .saturating_sub(healing_agents);
    let heal_events_this_hour = derive_count(
        &discriminate(&base, "heal-rate"),
        HEAL_RATE_MIN,
        HEAL_RATE_MAX,
    )?;

    let target = derive_target(deployment_id)?;
    let zones = target.zones();
    let short_id = short_id(deployment_id);
    let sample_size = total_agents.min(SAMPLE_AGENT_LIMIT);
    let sample_len = usize::try_from(sample_size).unwrap_or(0);

    let agents = derive_list(deployment_id, "agent", sample_len, |sub_seed, index| {
        build_agent(sub_seed, index, &short_id, zones, clock)
    })?;

    let spec = RecordSpec {
        prefix: "evt",
        templates: &HEAL_TEMPLATES,
        zones,
        max_offset: TimeDelta::minutes(2),
    };
    let mut recent_heal_events =
        derive_list(deployment_id, "event", RECENT_EVENT_COUNT, |sub_seed, index| {
            build_heal_event(sub_seed, index, &short_id, sample_len, &spec, clock)
        })?;
    recent_heal_events.sort_by(|a, b| b.record.timestamp.cmp(&a.record.timestamp));

    let started_at = offset_timestamp(clock, &discriminate(&base, "started"), TimeDelta::hours(6))?;

    debug!(
        deployment_id,
        runbook_slug,
        ?target,
        total_agents,
        "generated swarm deployment snapshot"
    );

    Ok(SwarmDeployment {
        deployment_id: deployment_id.to_owned(),
        runbook_slug: runbook_slug.to_owned(),
        simulated: true,
        target,
        total_agents,
        active_agents,
        healing_agents,
        lost_agents,
        heal_events_this_hour,
        started_at,
        zones: zones.iter().map(|zone| (*zone).to_owned()).collect(),
        agents,
        recent_heal_events,
    })
}

fn build_agent(
    sub_seed: &str,
    index: usize,
    short_id: &str,
    zones: &[&str],
    clock: &dyn Clock,
) -> Result<SwarmAgent, DerivationError> {
    let roll = derive_count(&discriminate(sub_seed, "status"), 0, STATUS_BUCKETS - 1)?;
    let zone = derive_enum(&discriminate(sub_seed, "zone"), zones)?;
    let last_seen = offset_timestamp(
        clock,
        &discriminate(sub_seed, "last-seen"),
        TimeDelta::seconds(30),
    )?;
    let heal_events = derive_count(&discriminate(sub_seed, "heals"), 0, 7)?;

    Ok(SwarmAgent {
        id: agent_id(short_id, index),
        status: AgentStatus::from_roll(roll),
        zone: (*zone).to_owned(),
        last_seen,
        heal_events,
    })
}

fn build_heal_event(
    sub_seed: &str,
    index: usize,
    short_id: &str,
    sample_len: usize,
    spec: &RecordSpec<'_>,
    clock: &dyn Clock,
) -> Result<HealEvent, DerivationError> {
    let mut record = assemble_record(sub_seed, spec, clock)?;
    let spacing = i64::try_from(index)
        .unwrap_or(0)
        .saturating_mul(EVENT_SPACING_MINUTES);
    record.timestamp = record
        .timestamp
        .checked_sub_signed(TimeDelta::minutes(spacing))
        .unwrap_or(record.timestamp);
    // Positional id replaces the seed-derived one.
    record.id = format!("{}-{short_id}-{index}", spec.prefix);
    let agent_index = derive_index(&discriminate(sub_seed, "agent"), sample_len)?;

    Ok(HealEvent {
        record,
        agent_id: agent_id(short_id, agent_index),
    })
}

fn agent_id(short_id: &str, index: usize) -> String {
    format!("agent-{short_id}-{index:03}")
}

/// Last six sanitised characters of the deployment identifier.
fn short_id(deployment_id: &str) -> String {
    let sanitized: Vec<char> = sanitize_seed(deployment_id).chars().collect();
    let tail: String = sanitized
        .iter()
        .skip(sanitized.len().saturating_sub(SHORT_ID_LENGTH))
        .collect();
    if tail.is_empty() { "x".to_owned() } else { tail }
}

const fn percent_of(total: u32, percent: u32) -> u32 {
    total.saturating_mul(percent).div_euclid(100)
}
