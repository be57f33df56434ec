//! State index (§3): state-name (case-insensitive) -> ordered set of job
//! references, ordered by `(state.created_at, job_key)`.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use jobstore_core::{CaseInsensitiveKey, JobKey, MonotonicTime};

#[derive(Debug, Default)]
pub struct StateIndex {
    by_state: BTreeMap<CaseInsensitiveKey, BTreeSet<(MonotonicTime, JobKey)>>,
}

impl StateIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes `job` from the index for `old_state` (if any) and inserts it
    /// into the index for `new_state`. A job is present in at most one
    /// state index at a time (I3).
    pub fn move_job(
        &mut self,
        job: JobKey,
        old: Option<(&str, MonotonicTime)>,
        new: (&str, MonotonicTime),
    ) {
        if let Some((old_name, old_created_at)) = old {
            self.remove(job, old_name, old_created_at);
        }
        let key = CaseInsensitiveKey::new(new.0);
        self.by_state
            .entry(key)
            .or_default()
            .insert((new.1, job));
    }

    pub fn remove(&mut self, job: JobKey, state_name: &str, created_at: MonotonicTime) {
        let key = CaseInsensitiveKey::new(state_name);
        if let Some(set) = self.by_state.get_mut(&key) {
            set.remove(&(created_at, job));
            if set.is_empty() {
                self.by_state.remove(&key);
            }
        }
    }

    /// Jobs in `state_name`, oldest-first.
    #[must_use]
    pub fn jobs_in_state(&self, state_name: &str) -> Vec<JobKey> {
        self.by_state
            .get(&CaseInsensitiveKey::new(state_name))
            .map(|set| set.iter().map(|(_, job)| *job).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn count_in_state(&self, state_name: &str) -> usize {
        self.by_state
            .get(&CaseInsensitiveKey::new(state_name))
            .map_or(0, BTreeSet::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(n: u64) -> MonotonicTime {
        MonotonicTime::from_ticks_ns(n)
    }

    #[test]
    fn move_job_is_case_insensitive_on_state_name() {
        let mut index = StateIndex::new();
        index.move_job(JobKey::Counter(1), None, ("Enqueued", t(1)));
        assert_eq!(index.count_in_state("ENQUEUED"), 1);
    }

    #[test]
    fn move_job_removes_from_old_state() {
        let mut index = StateIndex::new();
        index.move_job(JobKey::Counter(1), None, ("Enqueued", t(1)));
        index.move_job(JobKey::Counter(1), Some(("Enqueued", t(1))), ("Running", t(2)));
        assert_eq!(index.count_in_state("Enqueued"), 0);
        assert_eq!(index.count_in_state("Running"), 1);
    }

    #[test]
    fn jobs_in_state_ordered_oldest_first() {
        let mut index = StateIndex::new();
        index.move_job(JobKey::Counter(2), None, ("Enqueued", t(5)));
        index.move_job(JobKey::Counter(1), None, ("Enqueued", t(2)));
        let jobs = index.jobs_in_state("Enqueued");
        assert_eq!(jobs, vec![JobKey::Counter(1), JobKey::Counter(2)]);
    }
}
