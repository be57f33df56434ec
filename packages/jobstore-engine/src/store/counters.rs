//! Counter container (§3, §9 open question 3): signed 64-bit value, created
//! on first increment, destroyed at zero. Never subject to
//! `max_expiration_time` -- counters back statistics retention, which the
//! spec explicitly exempts from the expiry cap.

use std::time::Duration;

use jobstore_core::MonotonicTime;

use super::expiry::ExpirableMap;

#[derive(Debug, Default)]
pub struct CountersContainer {
    counters: ExpirableMap<i64>,
}

impl CountersContainer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> i64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    /// `incrementBy`: if the resulting value is zero, the counter is
    /// deleted even if it had an `expire_at` set -- delete wins over
    /// persist (§9 open question 3, implemented as specified).
    pub fn increment_by(&mut self, name: &str, value: i64) -> i64 {
        let counter = self.counters.get_or_add(name, || 0);
        *counter += value;
        let new_value = *counter;
        if new_value == 0 {
            self.counters.remove(name);
        }
        new_value
    }

    /// `incrementByWithExpiry`: increments, then applies an *uncapped*
    /// expiry (counters are immune to `max_expiration_time`). A result of
    /// zero still deletes the counter regardless of the expiry request.
    pub fn increment_by_with_expiry(
        &mut self,
        name: &str,
        value: i64,
        now: MonotonicTime,
        expire_in: Duration,
    ) -> i64 {
        let new_value = self.increment_by(name, value);
        if new_value != 0 {
            self.counters.expire(name, Some(now), Some(expire_in), |d| d);
        }
        new_value
    }

    pub fn evict_expired(&mut self, now: MonotonicTime) -> Vec<String> {
        self.counters.evict_expired(now)
    }
}
