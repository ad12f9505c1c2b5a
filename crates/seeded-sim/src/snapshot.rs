//! Rendering of simulation views as JSON.
//!
//! A snapshot request names a runbook and one view. The runbook is looked up
//! in a [`RunbookCatalogue`] and the view is rendered as a
//! [`serde_json::Value`].

use std::fmt;
use std::str::FromStr;

use mockable::Clock;
use serde_json::Value;
use tracing::debug;

use crate::catalogue::RunbookCatalogue;
use crate::error::SnapshotError;
use crate::provenance::{export_document, generate_chain, inclusion_proof, verify_chain};
use crate::swarm::{generate_swarm_deployment, make_deployment_id};
use crate::temporal::temporal_history;

/// The views a snapshot can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotView {
    /// Swarm deployment snapshot.
    Swarm,
    /// Temporal evolution history.
    Temporal,
    /// Provenance chain export document.
    Provenance,
    /// Verification report of the provenance chain.
    Verify,
    /// Inclusion proof of one provenance event.
    Proof,
}

impl SnapshotView {
    /// Every view, in documentation order.
    pub const ALL: [Self; 5] = [
        Self::Swarm,
        Self::Temporal,
        Self::Provenance,
        Self::Verify,
        Self::Proof,
    ];

    /// Name used on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Swarm => "swarm",
            Self::Temporal => "temporal",
            Self::Provenance => "provenance",
            Self::Verify => "verify",
            Self::Proof => "proof",
        }
    }
}

impl fmt::Display for SnapshotView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SnapshotView {
    type Err = SnapshotError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|view| view.as_str() == value)
            .ok_or_else(|| SnapshotError::UnknownView {
                view: value.to_owned(),
            })
    }
}

/// What to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRequest {
    /// Slug of the runbook in the catalogue.
    pub slug: String,
    /// View to render.
    pub view: SnapshotView,
    /// Deployment identifier for the swarm view; derived from the slug when
    /// absent.
    pub deployment_id: Option<String>,
    /// Event identifier for the proof view.
    pub event_id: Option<String>,
}

impl SnapshotRequest {
    /// Creates a request for `view` of `slug` with no optional identifiers.
    #[must_use]
    pub fn new(slug: impl Into<String>, view: SnapshotView) -> Self {
        Self {
            slug: slug.into(),
            view,
            deployment_id: None,
            event_id: None,
        }
    }
}

/// Renders the requested view.
///
/// # Errors
///
/// Returns [`SnapshotError::Catalogue`] when the slug is unknown,
/// [`SnapshotError::MissingEventId`] for a proof request without an event,
/// and [`SnapshotError::Derivation`] or [`SnapshotError::Serialisation`] when
/// generation fails.
///
/// # Examples
///
/// ```
/// use mockable::DefaultClock;
/// use seeded_sim::{RunbookCatalogue, SnapshotRequest, SnapshotView, render_snapshot};
///
/// let catalogue = RunbookCatalogue::from_json(
///     r#"{"version": 1, "runbooks": [{"slug": "ssh-hardening", "clawScore": 94, "stepCount": 7}]}"#,
/// )
/// .expect("valid catalogue");
/// let request = SnapshotRequest::new("ssh-hardening", SnapshotView::Verify);
/// let value = render_snapshot(&request, &catalogue, &DefaultClock).expect("rendered");
/// assert_eq!(value["valid"], true);
/// ```
pub fn render_snapshot(
    request: &SnapshotRequest,
    catalogue: &RunbookCatalogue,
    clock: &dyn Clock,
) -> Result<Value, SnapshotError> {
    let runbook = catalogue.find(&request.slug)?;
    debug!(slug = %runbook.slug, view = %request.view, "rendering snapshot");

    let value = match request.view {
        SnapshotView::Swarm => {
            let deployment_id = request
                .deployment_id
                .clone()
                .unwrap_or_else(|| make_deployment_id(&runbook.slug));
            serde_json::to_value(generate_swarm_deployment(
                &deployment_id,
                &runbook.slug,
                clock,
            )?)?
        }
        SnapshotView::Temporal => serde_json::to_value(temporal_history(runbook)?)?,
        SnapshotView::Provenance => {
            let chain = generate_chain(runbook)?;
            serde_json::to_value(export_document(&chain, clock))?
        }
        SnapshotView::Verify => serde_json::to_value(verify_chain(&generate_chain(runbook)?))?,
        SnapshotView::Proof => {
            let event_id = request
                .event_id
                .as_deref()
                .ok_or(SnapshotError::MissingEventId)?;
            serde_json::to_value(inclusion_proof(&generate_chain(runbook)?, event_id))?
        }
    };
    Ok(value)
}
