//! Queries (C8): read-only lookups against the [`StateStore`], returning
//! owned copies so the caller can freely mutate the result without
//! touching the store (§4.8: "read queries return copies").

use jobstore_core::{Job, JobKey, SortedSetEntry, StringComparer};

use crate::store::StateStore;

/// Snapshot of a job at query time, detached from the store.
pub type JobSnapshot = Job;

#[must_use]
pub fn job(store: &StateStore, key: JobKey) -> Option<JobSnapshot> {
    store.jobs.get(key).cloned()
}

#[must_use]
pub fn jobs_in_state(store: &StateStore, state: &str) -> Vec<JobKey> {
    store.jobs.state_index.jobs_in_state(state)
}

#[must_use]
pub fn count_in_state(store: &StateStore, state: &str) -> usize {
    store.jobs.state_index.count_in_state(state)
}

#[must_use]
pub fn queue_peek(store: &StateStore, queue: &str, count: usize) -> Vec<JobKey> {
    store.queues.peek(queue, count)
}

#[must_use]
pub fn queue_count(store: &StateStore, queue: &str) -> usize {
    store.queues.count(queue)
}

#[must_use]
pub fn queue_range(store: &StateStore, queue: &str, from: usize, to: usize) -> Vec<JobKey> {
    store.queues.range(queue, from, to)
}

#[must_use]
pub fn counter_get(store: &StateStore, name: &str) -> i64 {
    store.counters.get(name)
}

#[must_use]
pub fn hash_get(store: &StateStore, name: &str) -> Option<std::collections::BTreeMap<String, String>> {
    store.hashes.get(name).cloned()
}

#[must_use]
pub fn list_range(store: &StateStore, name: &str, from: usize, to: usize) -> Vec<String> {
    store.lists.range(name, from, to)
}

#[must_use]
pub fn list_all(store: &StateStore, name: &str) -> Vec<String> {
    store.lists.all(name)
}

#[must_use]
pub fn sorted_set_scan(store: &StateStore, name: &str, comparer: StringComparer) -> Vec<SortedSetEntry> {
    store.sorted_sets.scan(name, comparer)
}

#[must_use]
pub fn sorted_set_first_in_range(
    store: &StateStore,
    name: &str,
    min: f64,
    max: f64,
    comparer: StringComparer,
) -> Option<String> {
    store.sorted_sets.first_by_score_range(name, min, max, comparer)
}

#[must_use]
pub fn server(store: &StateStore, id: &str) -> Option<jobstore_core::ServerEntry> {
    store.servers.get(id).cloned()
}

#[must_use]
pub fn all_servers(store: &StateStore) -> Vec<jobstore_core::ServerEntry> {
    store.servers.all()
}
