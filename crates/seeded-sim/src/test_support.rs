//! Shared test doubles for unit tests.

use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;

/// Clock pinned to a single instant.
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Returns a clock pinned `delta` later than this one.
    pub fn advanced_by(&self, delta: TimeDelta) -> Self {
        Self(self.0 + delta)
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Clock pinned to 2026-03-01T09:30:00Z.
pub fn fixture_clock() -> FixedClock {
    match Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).single() {
        Some(instant) => FixedClock(instant),
        None => panic!("fixture timestamp is unambiguous"),
    }
}
