//! Monotonic clock (C1): a tick source unaffected by wall-clock jumps.

use std::time::Instant;

use jobstore_core::MonotonicTime;

/// Source of `now()` readings for all expiry math. Injectable so tests can
/// advance time deterministically instead of sleeping.
pub trait MonotonicClock: Send + Sync {
    fn now(&self) -> MonotonicTime;
}

/// Real clock backed by `std::time::Instant`.
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for SystemClock {
    fn now(&self) -> MonotonicTime {
        let elapsed = self.epoch.elapsed();
        MonotonicTime::from_ticks_ns(u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX))
    }
}

/// Deterministic clock for tests: advances only when told to.
#[derive(Default)]
pub struct VirtualClock {
    ticks_ns: parking_lot::Mutex<u64>,
}

impl VirtualClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: std::time::Duration) {
        let mut ticks = self.ticks_ns.lock();
        *ticks = ticks.saturating_add(u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX));
    }
}

impl MonotonicClock for VirtualClock {
    fn now(&self) -> MonotonicTime {
        MonotonicTime::from_ticks_ns(*self.ticks_ns.lock())
    }
}
