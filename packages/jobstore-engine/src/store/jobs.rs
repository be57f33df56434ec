//! Job container operations (§4.2): create, set state, expire/persist,
//! delete. Called only from the dispatcher thread.

use std::collections::BTreeMap;
use std::time::Duration;

use jobstore_core::{Job, JobKey, MonotonicTime, StateRecord};

use super::expiry::ExpirationIndex;
use super::state_index::StateIndex;

#[derive(Debug, Default)]
pub struct JobsContainer {
    jobs: BTreeMap<JobKey, Job>,
    expiration: ExpirationIndex<JobKey>,
    pub state_index: StateIndex,
}

impl JobsContainer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: JobKey) -> Option<&Job> {
        self.jobs.get(&key)
    }

    #[must_use]
    pub fn contains(&self, key: JobKey) -> bool {
        self.jobs.contains_key(&key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// `jobCreate`: inserts a new job, optionally scheduling expiry using
    /// `job.created_at` as the reference point. A just-created job is never
    /// capped by `max_expiration_time` -- the window between create and an
    /// immediate follow-up `set_state` must survive uncapped.
    pub fn create(&mut self, mut job: Job, expire_in: Option<Duration>) {
        let key = job.key;
        if let Some(expire_in) = expire_in {
            let expire_at = job.created_at.checked_add(expire_in);
            job.expire_at = Some(expire_at);
            self.expiration.set(key, None, expire_at);
        }
        self.jobs.insert(key, job);
    }

    /// `jobSetState`: atomically moves the job between state-index buckets
    /// and installs the new current state (I3).
    pub fn set_state(&mut self, key: JobKey, record: StateRecord, max_history: usize) {
        let Some(job) = self.jobs.get_mut(&key) else {
            return; // idempotent-by-absence
        };
        let old = job
            .current_state
            .as_ref()
            .map(|s| (s.name.clone(), s.created_at));
        job.set_state(record.clone(), max_history);
        self.state_index.move_job(
            key,
            old.as_ref().map(|(name, created_at)| (name.as_str(), *created_at)),
            (record.name.as_str(), record.created_at),
        );
    }

    /// `jobExpire`: if both `now` and `expire_in` are present, applies
    /// `min(expire_in, max_expiration)` (the cap is applied by the caller,
    /// which has access to `EngineConfig`); deletes immediately if the
    /// resulting duration is `<= 0`. If either is absent, clears
    /// `expire_at` (the "persist" operation).
    pub fn expire(&mut self, key: JobKey, now: Option<MonotonicTime>, expire_in: Option<Duration>) {
        let Some(job) = self.jobs.get(&key) else {
            return;
        };
        match (now, expire_in) {
            (Some(now), Some(expire_in)) => {
                if expire_in.is_zero() {
                    self.delete(key);
                    return;
                }
                let previous = job.expire_at;
                let expire_at = now.checked_add(expire_in);
                if let Some(job) = self.jobs.get_mut(&key) {
                    job.expire_at = Some(expire_at);
                }
                self.expiration.set(key, previous, expire_at);
            }
            _ => {
                if let Some(previous) = job.expire_at {
                    self.expiration.clear_entry(&key, previous);
                }
                if let Some(job) = self.jobs.get_mut(&key) {
                    job.expire_at = None;
                }
            }
        }
    }

    pub fn delete(&mut self, key: JobKey) -> Option<Job> {
        let job = self.jobs.remove(&key)?;
        if let Some(expire_at) = job.expire_at {
            self.expiration.clear_entry(&key, expire_at);
        }
        if let Some(state) = &job.current_state {
            self.state_index.remove(key, &state.name, state.created_at);
        }
        Some(job)
    }

    pub fn evict_expired(&mut self, now: MonotonicTime) -> Vec<JobKey> {
        let due = self.expiration.drain_due(now);
        for key in &due {
            if let Some(job) = self.jobs.remove(key) {
                if let Some(state) = &job.current_state {
                    self.state_index.remove(*key, &state.name, state.created_at);
                }
            }
        }
        due
    }

    /// `jobAddState`: appends to history without changing the job's current
    /// state or its state-index bucket.
    pub fn add_state(&mut self, key: JobKey, record: StateRecord, max_history: usize) {
        if let Some(job) = self.jobs.get_mut(&key) {
            job.add_state(record, max_history);
        }
    }

    pub fn set_parameter(&mut self, key: JobKey, name: impl Into<String>, value: impl Into<String>) {
        if let Some(job) = self.jobs.get_mut(&key) {
            job.parameters.set(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(n: u64) -> MonotonicTime {
        MonotonicTime::from_ticks_ns(n)
    }

    fn job(key: u64, created_at: u64) -> Job {
        Job::new(JobKey::Counter(key), vec![], t(created_at))
    }

    #[test]
    fn create_without_expiry_is_not_indexed() {
        let mut jobs = JobsContainer::new();
        jobs.create(job(1, 0), None);
        assert!(jobs.contains(JobKey::Counter(1)));
        assert_eq!(jobs.evict_expired(t(u64::MAX)).len(), 0);
    }

    #[test]
    fn create_with_expiry_schedules_from_created_at() {
        let mut jobs = JobsContainer::new();
        jobs.create(job(1, 100), Some(Duration::from_nanos(50)));
        assert_eq!(
            jobs.get(JobKey::Counter(1)).unwrap().expire_at,
            Some(t(150))
        );
    }

    #[test]
    fn set_state_moves_job_between_buckets() {
        let mut jobs = JobsContainer::new();
        jobs.create(job(1, 0), None);
        jobs.set_state(JobKey::Counter(1), StateRecord::new("Enqueued", t(1)), 10);
        assert_eq!(jobs.state_index.count_in_state("Enqueued"), 1);
        jobs.set_state(JobKey::Counter(1), StateRecord::new("Running", t(2)), 10);
        assert_eq!(jobs.state_index.count_in_state("Enqueued"), 0);
        assert_eq!(jobs.state_index.count_in_state("Running"), 1);
    }

    #[test]
    fn expire_with_zero_duration_deletes_immediately() {
        let mut jobs = JobsContainer::new();
        jobs.create(job(1, 0), None);
        jobs.expire(JobKey::Counter(1), Some(t(0)), Some(Duration::ZERO));
        assert!(!jobs.contains(JobKey::Counter(1)));
    }

    #[test]
    fn expire_with_missing_now_persists() {
        let mut jobs = JobsContainer::new();
        jobs.create(job(1, 0), Some(Duration::from_nanos(10)));
        jobs.expire(JobKey::Counter(1), None, None);
        assert_eq!(jobs.get(JobKey::Counter(1)).unwrap().expire_at, None);
        assert_eq!(jobs.evict_expired(t(u64::MAX)).len(), 0);
    }

    #[test]
    fn expire_on_missing_job_is_noop() {
        let mut jobs = JobsContainer::new();
        jobs.expire(JobKey::Counter(99), Some(t(0)), Some(Duration::from_secs(1)));
    }

    #[test]
    fn add_state_appends_history_without_moving_current_state() {
        let mut jobs = JobsContainer::new();
        jobs.create(job(1, 0), None);
        jobs.set_state(JobKey::Counter(1), StateRecord::new("Enqueued", t(1)), 10);
        jobs.add_state(JobKey::Counter(1), StateRecord::new("Retrying", t(2)), 10);
        let current = jobs.get(JobKey::Counter(1)).unwrap().current_state.as_ref().unwrap();
        assert_eq!(current.name, "Enqueued");
        assert_eq!(jobs.get(JobKey::Counter(1)).unwrap().history.len(), 2);
    }

    #[test]
    fn evict_expired_removes_from_state_index_too() {
        let mut jobs = JobsContainer::new();
        jobs.create(job(1, 0), Some(Duration::from_nanos(10)));
        jobs.set_state(JobKey::Counter(1), StateRecord::new("Enqueued", t(1)), 10);
        jobs.evict_expired(t(10));
        assert_eq!(jobs.state_index.count_in_state("Enqueued"), 0);
        assert!(!jobs.contains(JobKey::Counter(1)));
    }
}
