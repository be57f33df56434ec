//! State Store (C2): single-threaded in-memory data model. Operations here
//! are only ever called from the dispatcher thread (C5) -- `StateStore`
//! itself is `!Sync` by convention (nothing enforces it in the type system
//! beyond the dispatcher being the sole caller, matching §5's "shared but
//! mutated from exactly one thread").

pub mod counters;
pub mod expiry;
pub mod hashes;
pub mod jobs;
pub mod lists;
pub mod queues;
pub mod servers;
pub mod sorted_sets;
pub mod state_index;

use jobstore_core::MonotonicTime;

use counters::CountersContainer;
use hashes::HashesContainer;
use jobs::JobsContainer;
use lists::ListsContainer;
use queues::QueuesContainer;
use servers::ServersContainer;
use sorted_sets::SortedSetsContainer;

/// The full in-memory data model (§3): jobs, queues, and the four
/// auxiliary container kinds, plus their expiration/state indexes.
#[derive(Debug, Default)]
pub struct StateStore {
    pub jobs: JobsContainer,
    pub queues: QueuesContainer,
    pub hashes: HashesContainer,
    pub lists: ListsContainer,
    pub sorted_sets: SortedSetsContainer,
    pub counters: CountersContainer,
    pub servers: ServersContainer,
}

/// Summary of one eviction sweep, for logging/observability.
#[derive(Debug, Clone, Default)]
pub struct EvictionReport {
    pub jobs: usize,
    pub hashes: usize,
    pub lists: usize,
    pub sorted_sets: usize,
    pub counters: usize,
}

impl StateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `evictExpiredEntries`: for each expiration index, removes every
    /// entry whose `expire_at <= now` (P4).
    pub fn evict_expired_entries(&mut self, now: MonotonicTime) -> EvictionReport {
        let report = EvictionReport {
            jobs: self.jobs.evict_expired(now).len(),
            hashes: self.hashes.evict_expired(now).len(),
            lists: self.lists.evict_expired(now).len(),
            sorted_sets: self.sorted_sets.evict_expired(now).len(),
            counters: self.counters.evict_expired(now).len(),
        };
        if report.jobs + report.hashes + report.lists + report.sorted_sets + report.counters > 0 {
            tracing::debug!(
                jobs = report.jobs,
                hashes = report.hashes,
                lists = report.lists,
                sorted_sets = report.sorted_sets,
                counters = report.counters,
                "evicted expired entries"
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobstore_core::{Job, JobKey};
    use std::time::Duration;

    #[test]
    fn evict_expired_entries_sweeps_all_kinds() {
        let mut store = StateStore::new();
        store
            .jobs
            .create(Job::new(JobKey::Counter(1), vec![], MonotonicTime::from_ticks_ns(0)), Some(Duration::from_nanos(10)));
        store.counters.increment_by("c", 1);
        store
            .counters
            .increment_by_with_expiry("c2", 1, MonotonicTime::from_ticks_ns(0), Duration::from_nanos(10));

        let report = store.evict_expired_entries(MonotonicTime::from_ticks_ns(10));
        assert_eq!(report.jobs, 1);
        assert_eq!(report.counters, 1);
        assert_eq!(store.counters.get("c"), 1);
    }
}
