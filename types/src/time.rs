//! Timestamp type and the clock seam.
//!
//! Timestamps are Unix epoch milliseconds (UTC), server-assigned. Every
//! component that reads the time takes a [`Clock`] so tests can pin it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A Unix timestamp in milliseconds since epoch (UTC).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch (time zero).
    pub const EPOCH: Self = Self(0);

    pub fn new(millis: u64) -> Self {
        Self(millis)
    }

    /// Get the current system time as a `Timestamp`.
    ///
    /// A system clock set before 1970 reads as the epoch.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self(millis)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Signed milliseconds left until `self + window_ms`, relative to `now`.
    /// Negative once the window has elapsed.
    pub fn remaining_ms(&self, window_ms: u64, now: Timestamp) -> i64 {
        let deadline = self.0.saturating_add(window_ms) as i128;
        (deadline - now.0 as i128).clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    /// Whether this timestamp + window has passed relative to `now`.
    pub fn has_expired(&self, window_ms: u64, now: Timestamp) -> bool {
        self.remaining_ms(window_ms, now) < 0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}
