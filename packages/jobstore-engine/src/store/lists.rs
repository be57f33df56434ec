//! List container (§3, §4.2): ordered sequence with LIFO insertion. The
//! underlying sequence is append-only; user-visible index 0 is the most
//! recently inserted element (the sequence is logically reversed on read).

use std::collections::VecDeque;
use std::time::Duration;

use jobstore_core::MonotonicTime;

use super::expiry::ExpirableMap;

#[derive(Debug, Default)]
pub struct ListsContainer {
    lists: ExpirableMap<VecDeque<String>>,
}

impl ListsContainer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `listAdd`/"insert": appends to the underlying sequence.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.lists.get_or_add(name, VecDeque::new).push_back(value.into());
    }

    /// User-visible range `[from, to]` (inclusive), index 0 = most recent.
    #[must_use]
    pub fn range(&self, name: &str, from: usize, to: usize) -> Vec<String> {
        let Some(underlying) = self.lists.get(name) else {
            return Vec::new();
        };
        let reversed: Vec<&String> = underlying.iter().rev().collect();
        reversed
            .into_iter()
            .skip(from)
            .take(to.saturating_sub(from) + 1)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn all(&self, name: &str) -> Vec<String> {
        self.lists
            .get(name)
            .map(|l| l.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    /// Removes every occurrence of `value` from the underlying sequence.
    /// Deletes the list entirely if it becomes empty (I1).
    pub fn remove_all(&mut self, name: &str, value: &str) -> usize {
        let Some(underlying) = self.lists.get_mut(name) else {
            return 0;
        };
        let before = underlying.len();
        underlying.retain(|v| v != value);
        let removed = before - underlying.len();
        if underlying.is_empty() {
            self.lists.remove(name);
        }
        removed
    }

    /// `listTrim`: keeps only elements whose user-visible index lies in
    /// `[from, to]`. Deletes the list if empty afterwards.
    pub fn trim(&mut self, name: &str, from: usize, to: usize) {
        let Some(underlying) = self.lists.get_mut(name) else {
            return;
        };
        let kept: VecDeque<String> = underlying
            .iter()
            .rev()
            .skip(from)
            .take(to.saturating_sub(from) + 1)
            .rev()
            .cloned()
            .collect();
        *underlying = kept;
        if underlying.is_empty() {
            self.lists.remove(name);
        }
    }

    pub fn expire(
        &mut self,
        name: &str,
        now: Option<MonotonicTime>,
        expire_in: Option<Duration>,
        cap: impl Fn(Duration) -> Duration,
    ) {
        self.lists.expire(name, now, expire_in, cap);
    }

    pub fn evict_expired(&mut self, now: MonotonicTime) -> Vec<String> {
        self.lists.evict_expired(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_order_reversed_on_read() {
        let mut lists = ListsContainer::new();
        lists.insert("L", "a");
        lists.insert("L", "b");
        lists.insert("L", "c");
        assert_eq!(lists.range("L", 0, 1), vec!["c", "b"]);
    }

    #[test]
    fn trim_keeps_only_requested_range() {
        let mut lists = ListsContainer::new();
        lists.insert("L", "a");
        lists.insert("L", "b");
        lists.insert("L", "c");
        lists.trim("L", 0, 0);
        assert_eq!(lists.all("L"), vec!["c"]);
    }

    #[test]
    fn trim_to_empty_deletes_list() {
        let mut lists = ListsContainer::new();
        lists.insert("L", "a");
        lists.trim("L", 5, 10);
        assert!(lists.all("L").is_empty());
    }

    #[test]
    fn remove_all_deletes_when_list_becomes_empty() {
        let mut lists = ListsContainer::new();
        lists.insert("L", "a");
        assert_eq!(lists.remove_all("L", "a"), 1);
        assert!(lists.all("L").is_empty());
    }
}
