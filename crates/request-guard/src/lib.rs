//! Guards for untrusted input reaching the API routes.
//!
//! # Overview
//!
//! - [`PayloadGuard`] validates JSON request bodies against size, depth,
//!   injection-pattern, and per-field rules, rejecting with an HTTP status.
//! - [`WebhookEvent`] parses verified commerce webhook bodies into a closed
//!   set of events and turns paid checkouts into an [`AccessGrant`].
//! - [`UsageTracker`] counts API calls and holds temporary IP blocks in an
//!   explicitly owned, in-memory store.
//!
//! Time is always read from an injected [`mockable::Clock`] or passed in as a
//! value, so every guard is deterministic under test.

mod error;
mod payload;
mod usage;
mod webhook;

pub use error::{GuardBuildError, PayloadRejection, WebhookError};
pub use payload::{
    DEFAULT_MAX_BYTES, DEFAULT_MAX_DEPTH, FieldKind, FieldRule, PayloadGuard, PayloadGuardBuilder,
};
pub use usage::{ActiveBlock, DEFAULT_BLOCK_DURATION, IpUsage, MAX_IP_LEN, UsageTracker};
pub use webhook::{
    ACCESS_GRANT_VERSION, AccessGrant, AccessPlan, CheckoutSession, CustomerDetails, ExpandableId,
    Subscription, WebhookEvent,
};
