//! Wall-clock source for admission.
//!
//! The node does not run NTP itself. Whatever keeps the host in sync reports
//! observed offsets through [`SyncedClock::record_offset`]; until the first
//! report, or while the last one exceeded the drift tolerance, the clock
//! reads as unsynchronised and admission fails closed.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use cairn_types::{NetworkClock, Timestamp};
use tracing::warn;

pub struct SyncedClock {
    /// Maximum acceptable drift before the clock is treated as unsynchronised.
    max_drift_ms: i64,
    /// Estimated offset from true UTC in milliseconds.
    offset_ms: AtomicI64,
    synced: AtomicBool,
}

impl SyncedClock {
    pub fn new(max_drift_ms: i64) -> Self {
        Self {
            max_drift_ms,
            offset_ms: AtomicI64::new(0),
            synced: AtomicBool::new(false),
        }
    }

    /// A clock that trusts the host time outright.
    pub fn trusting_host() -> Self {
        let clock = Self::new(i64::MAX);
        clock.synced.store(true, Ordering::SeqCst);
        clock
    }

    /// Blend an observed offset into the estimate: 7/8 old, 1/8 new after the
    /// first observation.
    pub fn record_offset(&self, observed_ms: i64) {
        let blended = if self.synced.load(Ordering::SeqCst) {
            let old = self.offset_ms.load(Ordering::SeqCst);
            (old.saturating_mul(7).saturating_add(observed_ms)) / 8
        } else {
            observed_ms
        };
        self.offset_ms.store(blended, Ordering::SeqCst);

        let within = observed_ms.unsigned_abs() <= self.max_drift_ms.unsigned_abs();
        if !within {
            warn!(
                observed_ms,
                max_drift_ms = self.max_drift_ms,
                "clock drift beyond tolerance; admission paused"
            );
        }
        self.synced.store(within, Ordering::SeqCst);
    }

    pub fn offset_ms(&self) -> i64 {
        self.offset_ms.load(Ordering::SeqCst)
    }

    fn host_millis() -> Option<u64> {
        let elapsed = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
        u64::try_from(elapsed.as_millis()).ok()
    }
}

impl NetworkClock for SyncedClock {
    fn now(&self) -> Option<Timestamp> {
        if !self.synced.load(Ordering::SeqCst) {
            return None;
        }
        let host = Self::host_millis()?;
        let adjusted = host.checked_add_signed(self.offset_ms())?;
        Some(Timestamp::from_millis(adjusted))
    }
}
