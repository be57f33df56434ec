//! Generic expiration index (§3 "Expiration index", I2) and the common
//! get-or-add/delete/expire shape shared by hashes, lists, sorted sets, and
//! counters (§4.2).

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use jobstore_core::MonotonicTime;

/// Ordered `(expire_at, key)` index for one expirable kind. Membership
/// invariant (I2): an entry is present here iff its `expire_at` is set, and
/// the tuple's timestamp always matches the entry's live `expire_at`.
#[derive(Debug)]
pub struct ExpirationIndex<K: Ord + Clone> {
    by_time: BTreeSet<(MonotonicTime, K)>,
}

impl<K: Ord + Clone> Default for ExpirationIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone> ExpirationIndex<K> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_time: BTreeSet::new(),
        }
    }

    /// Replaces any existing entry for `key` with `(expire_at, key)`.
    /// Callers must pass the entry's *previous* `expire_at` so the old
    /// tuple can be removed first (ordered sets are not addressable by key
    /// alone).
    pub fn set(&mut self, key: K, previous_expire_at: Option<MonotonicTime>, expire_at: MonotonicTime) {
        if let Some(prev) = previous_expire_at {
            self.by_time.remove(&(prev, key.clone()));
        }
        self.by_time.insert((expire_at, key));
    }

    pub fn clear_entry(&mut self, key: &K, previous_expire_at: MonotonicTime) {
        self.by_time.remove(&(previous_expire_at, key.clone()));
    }

    /// Drains and returns every key whose `expire_at <= now`, oldest first.
    pub fn drain_due(&mut self, now: MonotonicTime) -> Vec<K> {
        let mut due = Vec::new();
        while let Some((expire_at, _)) = self.by_time.iter().next() {
            if *expire_at > now {
                break;
            }
            let entry = self.by_time.iter().next().cloned().expect("checked above");
            self.by_time.remove(&entry);
            due.push(entry.1);
        }
        due
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_time.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_time.is_empty()
    }

    #[cfg(test)]
    pub fn contains(&self, expire_at: MonotonicTime, key: &K) -> bool {
        self.by_time.contains(&(expire_at, key.clone()))
    }
}

/// A named, expirable container keyed by string name. Shared shape for
/// hashes, lists, sorted sets, and counters: created on first write,
/// destroyed when it becomes logically empty, optionally expiring.
#[derive(Debug, Default)]
pub struct ExpirableMap<V> {
    entries: BTreeMap<String, (V, Option<MonotonicTime>)>,
    expiration: ExpirationIndex<String>,
}

impl<V> ExpirableMap<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            expiration: ExpirationIndex::new(),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&V> {
        self.entries.get(name).map(|(v, _)| v)
    }

    #[must_use]
    pub fn get_mut(&mut self, name: &str) -> Option<&mut V> {
        self.entries.get_mut(name).map(|(v, _)| v)
    }

    #[must_use]
    pub fn expire_at(&self, name: &str) -> Option<MonotonicTime> {
        self.entries.get(name).and_then(|(_, e)| *e)
    }

    /// Returns the existing entry for `name`, or inserts `default()` and
    /// returns that.
    pub fn get_or_add(&mut self, name: &str, default: impl FnOnce() -> V) -> &mut V {
        &mut self
            .entries
            .entry(name.to_string())
            .or_insert_with(|| (default(), None))
            .0
    }

    /// Removes `name` unconditionally (I1: emptying removes the primary
    /// map entry; callers are responsible for checking emptiness first
    /// when that is the removal trigger).
    pub fn remove(&mut self, name: &str) -> Option<(V, Option<MonotonicTime>)> {
        let removed = self.entries.remove(name)?;
        if let Some(expire_at) = removed.1 {
            self.expiration.clear_entry(&name.to_string(), expire_at);
        }
        Some(removed)
    }

    /// `...Expire`: applies `min(expire_in, cap(expire_in))` relative to
    /// `now` when both are present; clears `expire_at` ("persist") when
    /// either is absent. No-op if `name` does not exist.
    pub fn expire(
        &mut self,
        name: &str,
        now: Option<MonotonicTime>,
        expire_in: Option<Duration>,
        cap: impl Fn(Duration) -> Duration,
    ) {
        if !self.contains(name) {
            return;
        }
        match (now, expire_in) {
            (Some(now), Some(expire_in)) => {
                let capped = cap(expire_in);
                if capped.is_zero() {
                    self.remove(name);
                    return;
                }
                let previous = self.expire_at(name);
                let expire_at = now.checked_add(capped);
                self.expiration.set(name.to_string(), previous, expire_at);
                self.set_expire_at(name, Some(expire_at));
            }
            _ => {
                if let Some(previous) = self.expire_at(name) {
                    self.expiration.clear_entry(&name.to_string(), previous);
                }
                self.set_expire_at(name, None);
            }
        }
    }

    /// Removes and returns every name whose `expire_at <= now`.
    pub fn evict_expired(&mut self, now: MonotonicTime) -> Vec<String> {
        let due = self.expiration.drain_due(now);
        for name in &due {
            self.entries.remove(name);
        }
        due
    }

    fn set_expire_at(&mut self, name: &str, expire_at: Option<MonotonicTime>) {
        if let Some(entry) = self.entries.get_mut(name) {
            entry.1 = expire_at;
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
