//! Queue container (§3): created on first reference, FIFO of job keys.
//! Destruction of empty queues is permitted but not performed here --
//! retention avoids racing a concurrent `Fetcher` waiter install against a
//! queue-map removal (see DESIGN.md).

use std::collections::{BTreeMap, VecDeque};

use jobstore_core::JobKey;

#[derive(Debug, Default)]
pub struct QueuesContainer {
    queues: BTreeMap<String, VecDeque<JobKey>>,
}

impl QueuesContainer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, queue: &str, job: JobKey) {
        self.queues.entry(queue.to_string()).or_default().push_back(job);
    }

    pub fn pop(&mut self, queue: &str) -> Option<JobKey> {
        self.queues.get_mut(queue).and_then(VecDeque::pop_front)
    }

    #[must_use]
    pub fn peek(&self, queue: &str, count: usize) -> Vec<JobKey> {
        self.queues
            .get(queue)
            .map(|q| q.iter().take(count).copied().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn count(&self, queue: &str) -> usize {
        self.queues.get(queue).map_or(0, VecDeque::len)
    }

    #[must_use]
    pub fn range(&self, queue: &str, from: usize, to: usize) -> Vec<JobKey> {
        self.queues
            .get(queue)
            .map(|q| q.iter().skip(from).take(to.saturating_sub(from) + 1).copied().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn queue_names(&self) -> Vec<String> {
        self.queues.keys().cloned().collect()
    }
}
