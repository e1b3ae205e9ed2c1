//! Wall-clock helpers and the session time budget.

use std::time::{Duration, Instant, SystemTime};

pub fn wall_time_iso_utc() -> String {
    // Metadata only; budget decisions use `Instant`.
    let now = SystemTime::now();
    let dt: time::OffsetDateTime = now.into();
    dt.format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Monotonic wall-clock budget for one fuzzing session.
#[derive(Debug, Clone, Copy)]
pub struct TimeBudget {
    started: Instant,
    limit: Duration,
}

impl TimeBudget {
    pub fn start(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
    }

    /// True once strictly more than the limit has passed.
    pub fn exhausted(&self) -> bool {
        self.elapsed() > self.limit
    }
}
