//! Nullable clock: deterministic time for testing.

use cairn_types::{NetworkClock, Timestamp};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// A deterministic clock for testing.
///
/// Time only advances when you tell it to. It can also be put into the
/// "not synchronised" state to exercise fail-closed admission.
pub struct NullClock {
    current: AtomicU64,
    synced: AtomicBool,
}

impl NullClock {
    pub fn new(initial_millis: u64) -> Self {
        Self {
            current: AtomicU64::new(initial_millis),
            synced: AtomicBool::new(true),
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

    pub fn set_synced(&self, synced: bool) {
        self.synced.store(synced, Ordering::SeqCst);
    }
}

impl NetworkClock for NullClock {
    fn now(&self) -> Option<Timestamp> {
        if !self.synced.load(Ordering::SeqCst) {
            return None;
        }
        Some(Timestamp::from_millis(self.current.load(Ordering::SeqCst)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_only_when_told() {
        let clock = NullClock::new(1_000);
        assert_eq!(clock.now(), Some(Timestamp::from_millis(1_000)));
        clock.advance(500);
        assert_eq!(clock.now(), Some(Timestamp::from_millis(1_500)));
        clock.set(10);
        assert_eq!(clock.now(), Some(Timestamp::from_millis(10)));
    }

    #[test]
    fn unsynced_clock_reports_nothing() {
        let clock = NullClock::new(1_000);
        clock.set_synced(false);
        assert_eq!(clock.now(), None);
        clock.set_synced(true);
        assert!(clock.now().is_some());
    }
}
