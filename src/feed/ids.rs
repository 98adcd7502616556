//! Clock-derived identifiers.
//!
//! Feed ids and article parse stamps both come from one process-wide clock
//! that never issues the same millisecond value twice, so ids stay unique even
//! when several feeds are added or parsed within the same clock tick.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

static CLOCK: MonotonicClock = MonotonicClock::new();

/// Millisecond clock that only moves forward.
#[derive(Debug)]
pub struct MonotonicClock {
    last: AtomicU64,
}

impl MonotonicClock {
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Returns `max(now_ms, last + 1)` and records it.
    pub fn next(&self) -> u64 {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, candidate, Ordering::SeqCst, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(observed) => last = observed,
            }
        }
    }

    /// Makes sure every later value is strictly greater than `value`.
    pub fn observe(&self, value: u64) {
        self.last.fetch_max(value, Ordering::SeqCst);
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Fresh feed id.
pub fn next_feed_id() -> String {
    CLOCK.next().to_string()
}

/// Stamp shared by every article produced by one parse call.
pub fn next_parse_stamp() -> u64 {
    CLOCK.next()
}

/// Advances the clock past ids that were persisted by an earlier run.
pub fn observe_existing<'a, I>(ids: I)
where
    I: IntoIterator<Item = &'a str>,
{
    if let Some(max) = ids.into_iter().filter_map(|id| id.parse::<u64>().ok()).max() {
        CLOCK.observe(max);
    }
}

/// Legacy article id shape: `<stamp>-<index>`.
pub fn article_id(stamp: u64, index: usize) -> String {
    format!("{}-{}", stamp, index)
}
