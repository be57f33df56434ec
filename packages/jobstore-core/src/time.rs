//! Monotonic time values used for all expiry comparisons (C1).
//!
//! `MonotonicTime` is a tick count, not a wall-clock reading: it is never
//! affected by clock adjustments (NTP slew, DST, manual changes), so expiry
//! math stays correct across them. The actual clock source lives in
//! `jobstore-engine::clock` (it needs `std::time::Instant`, which this
//! crate intentionally does not depend on); this type only carries the
//! value and its arithmetic.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A single point on the monotonic tick line, in nanoseconds since some
/// unspecified, process-local epoch.
///
/// `MonotonicTime` values are only meaningfully compared against other
/// values produced by the same clock source within the same process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonotonicTime {
    ticks_ns: u64,
}

impl MonotonicTime {
    /// Wraps a raw tick count. Used by clock sources; callers should
    /// otherwise obtain values via `MonotonicClock::now()`.
    #[must_use]
    pub const fn from_ticks_ns(ticks_ns: u64) -> Self {
        Self { ticks_ns }
    }

    /// Raw tick count since the clock's epoch.
    #[must_use]
    pub const fn ticks_ns(self) -> u64 {
        self.ticks_ns
    }

    /// Duration elapsed from `earlier` to `self`. Saturates to zero if
    /// `earlier` is later than `self` (callers should not rely on negative
    /// durations; the spec's expiry math never needs them).
    #[must_use]
    pub fn duration_since(self, earlier: Self) -> Duration {
        Duration::from_nanos(self.ticks_ns.saturating_sub(earlier.ticks_ns))
    }

    /// `self + duration`, saturating at `u64::MAX` ticks.
    #[must_use]
    pub fn checked_add(self, duration: Duration) -> Self {
        let added = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        Self {
            ticks_ns: self.ticks_ns.saturating_add(added),
        }
    }

    /// One-way projection to a wall-clock-like epoch-millis value, for
    /// user-visible timestamps only (`Job::created_at`, DTOs, etc.). Never
    /// used for expiry comparisons.
    #[must_use]
    pub const fn as_wall_clock_millis_hint(self) -> u64 {
        self.ticks_ns / 1_000_000
    }
}

impl fmt::Display for MonotonicTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.ticks_ns)
    }
}
