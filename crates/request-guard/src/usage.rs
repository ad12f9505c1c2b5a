//! In-memory API usage tracking and IP blocking.
//!
//! A [`UsageTracker`] is an explicitly owned store: callers create it, share
//! it behind an `Arc`, and drop it with the process. Nothing is persisted, so
//! counts and blocks reset on restart.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::Serialize;
use tracing::info;

/// Longest client address accepted by [`UsageTracker::block_ip`], in
/// UTF-16 code units.
pub const MAX_IP_LEN: usize = 64;

/// Block duration used when the caller has no preference.
pub const DEFAULT_BLOCK_DURATION: TimeDelta = TimeDelta::hours(24);

/// Request count for one client address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IpUsage {
    /// Client address.
    pub ip: String,
    /// Calls recorded for the address.
    pub count: u64,
    /// Whether the address is blocked right now.
    pub blocked: bool,
}

/// A block that has not yet expired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveBlock {
    /// Blocked address.
    pub ip: String,
    /// Instant the block lapses.
    pub unblock_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct UsageState {
    endpoint_hits: HashMap<String, u64>,
    ip_hits: HashMap<String, u64>,
    blocked: HashMap<String, DateTime<Utc>>,
}

/// Counts API calls per endpoint and per client address, and holds
/// temporary address blocks.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use mockable::DefaultClock;
/// use request_guard::UsageTracker;
///
/// let tracker = UsageTracker::new(Arc::new(DefaultClock));
/// tracker.record_call("/api/check", Some("203.0.113.7"));
/// tracker.record_call("/api/check", None);
///
/// assert_eq!(tracker.endpoint_counts().get("/api/check"), Some(&2));
/// assert_eq!(tracker.top_ips(10).len(), 1);
/// ```
pub struct UsageTracker {
    clock: Arc<dyn Clock>,
    state: Mutex<UsageState>,
}

impl std::fmt::Debug for UsageTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageTracker")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl UsageTracker {
    /// Creates an empty tracker reading "now" from `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(UsageState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, UsageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records one call to `endpoint`. Empty or absent addresses are counted
    /// against the endpoint only.
    pub fn record_call(&self, endpoint: &str, ip: Option<&str>) {
        let mut state = self.state();
        bump(&mut state.endpoint_hits, endpoint);
        if let Some(address) = ip.filter(|address| !address.is_empty()) {
            bump(&mut state.ip_hits, address);
        }
    }

    /// Snapshot of call counts per endpoint.
    #[must_use]
    pub fn endpoint_counts(&self) -> BTreeMap<String, u64> {
        self.state()
            .endpoint_hits
            .iter()
            .map(|(endpoint, count)| (endpoint.clone(), *count))
            .collect()
    }

    /// The `limit` busiest addresses, highest count first. Ties are ordered
    /// by address.
    #[must_use]
    pub fn top_ips(&self, limit: usize) -> Vec<IpUsage> {
        let now = self.clock.utc();
        let state = self.state();
        let mut ranked: Vec<(&String, u64)> = state
            .ip_hits
            .iter()
            .map(|(ip, count)| (ip, *count))
            .collect();
        ranked.sort_by(|left, right| right.1.cmp(&left.1).then_with(|| left.0.cmp(right.0)));
        ranked
            .into_iter()
            .take(limit)
            .map(|(ip, count)| IpUsage {
                ip: ip.clone(),
                count,
                blocked: state.blocked.get(ip).is_some_and(|until| *until > now),
            })
            .collect()
    }

    /// Blocks `ip` for `duration`. Returns `false`, leaving existing blocks
    /// untouched, when the address is empty or longer than [`MAX_IP_LEN`].
    #[must_use]
    pub fn block_ip(&self, ip: &str, duration: TimeDelta) -> bool {
        if ip.is_empty() || ip.encode_utf16().count() > MAX_IP_LEN {
            return false;
        }
        let unblock_at = self.clock.utc() + duration;
        self.state().blocked.insert(ip.to_owned(), unblock_at);
        info!(ip, %unblock_at, "client address blocked");
        true
    }

    /// Whether `ip` is blocked now. An expired block is removed.
    #[must_use]
    pub fn is_blocked(&self, ip: &str) -> bool {
        let now = self.clock.utc();
        let mut state = self.state();
        let Some(until) = state.blocked.get(ip).copied() else {
            return false;
        };
        if until > now {
            return true;
        }
        state.blocked.remove(ip);
        false
    }

    /// Every unexpired block, ordered by address. Expired blocks are removed.
    #[must_use]
    pub fn active_blocks(&self) -> Vec<ActiveBlock> {
        let now = self.clock.utc();
        let mut state = self.state();
        state.blocked.retain(|_, until| *until > now);
        let mut blocks: Vec<ActiveBlock> = state
            .blocked
            .iter()
            .map(|(ip, until)| ActiveBlock {
                ip: ip.clone(),
                unblock_at: *until,
            })
            .collect();
        blocks.sort_by(|left, right| left.ip.cmp(&right.ip));
        blocks
    }
}

fn bump(counts: &mut HashMap<String, u64>, key: &str) {
    let count = counts.entry(key.to_owned()).or_insert(0);
    *count = count.saturating_add(1);
}
