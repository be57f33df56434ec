//! Fetcher (C7): blocking multi-queue fetch built on the state store (C2)
//! and the queue wait graph (C4). `fetch_next` scans the listed queues in
//! order on every iteration (a weak priority: the lowest-index non-empty
//! queue always wins), installs one wait-node per queue only on the first
//! empty pass, and loops until a pop succeeds, the deadline elapses, or the
//! caller's cancellation token fires.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use jobstore_core::JobKey;

use crate::dispatcher::Dispatcher;
use crate::error::{EngineError, Result};
use crate::wait_graph::{WaitGraph, WaitNode};

/// Cooperative cancellation flag, checked by the fetcher between wait
/// cycles. Clone to share between the fetching thread and whoever wants to
/// cancel it.
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A fetched job along with the queue it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub queue: String,
    pub job: JobKey,
}

impl PartialEq<(&str, JobKey)> for FetchResult {
    fn eq(&self, other: &(&str, JobKey)) -> bool {
        self.queue == other.0 && self.job == other.1
    }
}

/// Blocks on `queues` (tried in the given order on every scan) until one
/// yields a job, `deadline` passes, or `cancel` fires.
pub fn fetch_next(
    dispatcher: &Dispatcher,
    wait_graph: &WaitGraph,
    queues: &[String],
    deadline: Instant,
    cancel: &CancellationToken,
) -> Result<FetchResult> {
    let mut installed_nodes: Option<Vec<(String, Arc<WaitNode>)>> = None;

    loop {
        if cancel.is_cancelled() {
            cleanup(wait_graph, installed_nodes.take());
            return Err(EngineError::Cancelled);
        }

        for queue in queues {
            let popped = pop_from(dispatcher, queue)?;
            if let Some(job) = popped {
                cleanup(wait_graph, installed_nodes.take());
                // Propagate liveness: another waiter on this queue (if any)
                // should get a chance to notice more work may remain.
                wait_graph.signal_one(queue);
                return Ok(FetchResult { queue: queue.clone(), job });
            }
        }

        if installed_nodes.is_none() {
            installed_nodes = Some(
                queues
                    .iter()
                    .map(|queue| (queue.clone(), wait_graph.add_wait_node(queue)))
                    .collect(),
            );
        }

        let nodes = installed_nodes.as_ref().expect("installed above");
        let now = Instant::now();
        if now >= deadline {
            cleanup(wait_graph, installed_nodes.take());
            return Err(EngineError::DispatcherTimeout(Duration::ZERO));
        }

        // Wait on the first queue's node; a signal on any queue wakes this
        // thread because `signal_one`/`signal_all` release every node
        // installed for that queue and this is the only node we hold there.
        let wait_slice = Duration::from_millis(20).min(deadline - now);
        let woke = nodes.iter().any(|(_, node)| node.wait_until(Instant::now() + wait_slice));
        let _ = woke;
        // Loop back to (1) regardless of why we woke -- spurious wake-ups
        // and cancellation are both handled by re-checking at the top.
    }
}

/// Pops one job key off `queue`, if any -- a write, so it goes through
/// [`Dispatcher::submit`] rather than `read`, with the popped value handed
/// back via a shared slot.
fn pop_from(dispatcher: &Dispatcher, queue: &str) -> Result<Option<JobKey>> {
    let slot: Arc<Mutex<Option<JobKey>>> = Arc::new(Mutex::new(None));
    let slot_for_job = slot.clone();
    let queue = queue.to_string();
    dispatcher.submit(move |store| {
        *slot_for_job.lock().expect("fetcher result slot poisoned") = store.queues.pop(&queue);
    })?;
    let popped = slot.lock().expect("fetcher result slot poisoned").take();
    Ok(popped)
}

fn cleanup(wait_graph: &WaitGraph, nodes: Option<Vec<(String, Arc<WaitNode>)>>) {
    if let Some(nodes) = nodes {
        for (queue, node) in nodes {
            wait_graph.remove(&queue, &node);
        }
    }
}
