//! Deterministic seeded simulation snapshots for runbook pages.
//!
//! This crate derives stable, bounded pseudo-random state from string seeds:
//! the same seed always yields the same counts, statuses, labels, and
//! identifiers, with no storage involved. Timestamps are derived as offsets
//! from an injected clock, so they keep their distance from "now" while the
//! absolute instant moves.
//!
//! # Overview
//!
//! The crate supports:
//!
//! - A stable 32-bit string hash and bounded derivations built on it
//! - URL-safe identifiers derived from seeds
//! - Template-based record assembly
//! - Swarm deployment, temporal history, and provenance chain simulations
//! - Loading a runbook catalogue and rendering snapshot views as JSON
//!
//! Every simulation is labelled as such. Provenance digests and seals are
//! produced by a non-cryptographic mixing function and prove nothing.
//!
//! # Example
//!
//! ```
//! use seeded_sim::{derive_int, discriminate, make_id};
//!
//! let agents = derive_int("sw-aws-hardening-2026", 50, 500).expect("valid range");
//! assert_eq!(agents, 306);
//!
//! let zone_seed = discriminate("sw-aws-hardening-2026", "zone");
//! assert_eq!(zone_seed, "sw-aws-hardening-2026:zone");
//!
//! assert_eq!(make_id("My Slug!!", "sw", 12), "sw-myslug-85tb7l");
//! ```

mod atomic_io;
mod catalogue;
mod config;
mod derive;
mod error;
mod hash;
mod ident;
pub mod provenance;
mod record;
mod snapshot;
pub mod snapshot_cli;
mod swarm;
mod temporal;
#[cfg(test)]
mod test_support;

pub use catalogue::RunbookCatalogue;
pub use config::SnapshotSettings;
pub use derive::{
    derive_count, derive_enum, derive_index, derive_int, derive_list, derive_offset, discriminate,
    offset_timestamp,
};
pub use error::{CatalogueError, DerivationError, SnapshotError};
pub use hash::{SEED_HASH_LIMIT, SEED_TAIL_WINDOW, stable_hash, to_base36};
pub use ident::{HASH_SEGMENT_MAX, is_valid_slug, make_id, sanitize_seed};
pub use record::{RecordSpec, RecordTemplate, Severity, SimRecord, assemble_record};
pub use snapshot::{SnapshotRequest, SnapshotView, render_snapshot};
pub use swarm::{
    AgentStatus, HealEvent, RECENT_EVENT_COUNT, SAMPLE_AGENT_LIMIT, SWARM_AGENT_MAX,
    SWARM_AGENT_MIN, SwarmAgent, SwarmDeployment, TargetEnvironment, derive_target,
    generate_swarm_deployment, make_deployment_id,
};
pub use temporal::{
    DiffKind, RunbookRef, TemporalDiff, TemporalHistory, TemporalVersion, VersionBadge,
    find_version_by_quarter, quarter_labels, quarter_start, temporal_history,
};
