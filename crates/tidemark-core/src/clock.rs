//! Time source abstraction
//!
//! The engine reads "now" only through [`Clock`], so flush windows, checkpoint
//! intervals and downsampling buckets can be tested deterministically.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Milliseconds since the Unix epoch
pub type Millis = i64;

/// Injectable source of the current time
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch
    fn now_millis(&self) -> Millis;
}

/// System clock implementation (production use)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> Millis {
        Utc::now().timestamp_millis()
    }
}

/// Manually driven clock for tests and replays
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Create a clock fixed at `millis`
    pub fn new(millis: Millis) -> Self {
        Self {
            now: AtomicI64::new(millis),
        }
    }

    /// Move the clock to `millis`
    pub fn set(&self, millis: Millis) {
        self.now.store(millis, Ordering::SeqCst);
    }

    /// Advance the clock by `delta` milliseconds
    pub fn advance(&self, delta: Millis) {
        self.now.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> Millis {
        self.now.load(Ordering::SeqCst)
    }
}

/// Render a millisecond timestamp as RFC 3339, falling back to the raw number
pub fn format_millis(millis: Millis) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}

/// Parse either raw milliseconds or an RFC 3339 timestamp
pub fn parse_millis(input: &str) -> Option<Millis> {
    let trimmed = input.trim();
    if let Ok(millis) = trimmed.parse::<Millis>() {
        return Some(millis);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).timestamp_millis())
}
