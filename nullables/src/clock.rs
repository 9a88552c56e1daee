//! Nullable clock: deterministic time for testing.

use starreg_types::{Clock, Timestamp};
use std::sync::atomic::{AtomicU64, Ordering};

/// A deterministic clock for testing.
///
/// Time only advances when you tell it to. Shareable across threads.
pub struct NullClock {
    current: AtomicU64,
}

impl NullClock {
    pub fn new(initial_millis: u64) -> Self {
        Self {
            current: AtomicU64::new(initial_millis),
        }
    }

    /// Advance time by a number of milliseconds.
    pub fn advance(&self, millis: u64) {
        self.current.fetch_add(millis, Ordering::SeqCst);
    }

    /// Set the time to a specific value.
    pub fn set(&self, millis: u64) {
        self.current.store(millis, Ordering::SeqCst);
    }
}

impl Clock for NullClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.current.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_moves_time_forward() {
        let clock = NullClock::new(1_000);
        clock.advance(500);
        assert_eq!(clock.now(), Timestamp::new(1_500));
        clock.set(10);
        assert_eq!(clock.now(), Timestamp::new(10));
    }
}
