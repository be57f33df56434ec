//! Sorted set container (§3): `{value, score}` pairs, dual-indexed by
//! `(score, value)` for ordered scans and by `value` for O(log n)
//! presence/remove.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::time::Duration;

use jobstore_core::{MonotonicTime, SortedSetEntry, StringComparer};
use ordered_float::OrderedFloat;

use super::expiry::ExpirableMap;

#[derive(Debug, Default)]
struct SortedSetInner {
    by_value: BTreeMap<String, f64>,
    by_score: BTreeSet<(OrderedFloat<f64>, String)>,
}

impl SortedSetInner {
    fn add(&mut self, value: String, score: f64) {
        if let Some(old_score) = self.by_value.get(&value).copied() {
            self.by_score.remove(&(OrderedFloat(old_score), value.clone()));
        }
        self.by_value.insert(value.clone(), score);
        self.by_score.insert((OrderedFloat(score), value));
    }

    fn remove(&mut self, value: &str) -> bool {
        let Some(score) = self.by_value.remove(value) else {
            return false;
        };
        self.by_score.remove(&(OrderedFloat(score), value.to_string()));
        true
    }

    fn is_empty(&self) -> bool {
        self.by_value.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct SortedSetsContainer {
    sets: ExpirableMap<SortedSetInner>,
}

impl SortedSetsContainer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `add`: adds/updates one `(value, score)` pair.
    pub fn add(&mut self, name: &str, value: impl Into<String>, score: f64) {
        self.sets.get_or_add(name, SortedSetInner::default).add(value.into(), score);
    }

    /// `addRange`.
    pub fn add_range(&mut self, name: &str, entries: Vec<(String, f64)>) {
        let set = self.sets.get_or_add(name, SortedSetInner::default);
        for (value, score) in entries {
            set.add(value, score);
        }
    }

    /// Removes a single value. Deletes the set when it becomes empty (I1).
    pub fn remove(&mut self, name: &str, value: &str) {
        if let Some(set) = self.sets.get_mut(name) {
            set.remove(value);
            if set.is_empty() {
                self.sets.remove(name);
            }
        }
    }

    /// Deletes the entire sorted set.
    pub fn delete(&mut self, name: &str) {
        self.sets.remove(name);
    }

    /// Forward scan (score ascending, value tiebreak under `comparer`) of
    /// `(value, score)` pairs (P5).
    #[must_use]
    pub fn scan(&self, name: &str, comparer: StringComparer) -> Vec<SortedSetEntry> {
        let Some(set) = self.sets.get(name) else {
            return Vec::new();
        };
        let mut entries: Vec<SortedSetEntry> = set
            .by_score
            .iter()
            .map(|(score, value)| SortedSetEntry::new(value.clone(), score.0))
            .collect();
        entries.sort_by(|a, b| {
            a.ordered_score()
                .cmp(&b.ordered_score())
                .then_with(|| comparer.compare(&a.value, &b.value))
        });
        entries
    }

    /// First value whose score lies in `[min, max]`, per the configured
    /// scan order.
    #[must_use]
    pub fn first_by_score_range(
        &self,
        name: &str,
        min: f64,
        max: f64,
        comparer: StringComparer,
    ) -> Option<String> {
        self.scan(name, comparer)
            .into_iter()
            .find(|e| e.score >= min && e.score <= max)
            .map(|e| e.value)
    }

    pub fn expire(
        &mut self,
        name: &str,
        now: Option<MonotonicTime>,
        expire_in: Option<Duration>,
        cap: impl Fn(Duration) -> Duration,
    ) {
        self.sets.expire(name, now, expire_in, cap);
    }

    pub fn evict_expired(&mut self, now: MonotonicTime) -> Vec<String> {
        self.sets.evict_expired(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_orders_by_score_then_value() {
        let mut sets = SortedSetsContainer::new();
        sets.add("S", "x", 2.0);
        sets.add("S", "y", 1.0);
        sets.add("S", "z", 1.0);
        let values: Vec<_> = sets
            .scan("S", StringComparer::Ordinal)
            .into_iter()
            .map(|e| e.value)
            .collect();
        assert_eq!(values, vec!["y", "z", "x"]);
    }

    #[test]
    fn first_by_score_range_finds_lowest_matching() {
        let mut sets = SortedSetsContainer::new();
        sets.add("S", "x", 2.0);
        sets.add("S", "y", 1.0);
        sets.add("S", "z", 1.0);
        assert_eq!(
            sets.first_by_score_range("S", 1.0, 1.5, StringComparer::Ordinal),
            Some("y".to_string())
        );
    }

    #[test]
    fn remove_deletes_set_when_empty() {
        let mut sets = SortedSetsContainer::new();
        sets.add("S", "x", 1.0);
        sets.remove("S", "x");
        assert!(sets.scan("S", StringComparer::Ordinal).is_empty());
    }

    #[test]
    fn add_overwrites_score_for_existing_value() {
        let mut sets = SortedSetsContainer::new();
        sets.add("S", "x", 1.0);
        sets.add("S", "x", 5.0);
        let scan = sets.scan("S", StringComparer::Ordinal);
        assert_eq!(scan.len(), 1);
        assert_eq!(scan[0].score, 5.0);
    }
}
