//! Queue Wait Graph (C4): per-queue intrusive list of one-shot wait-nodes
//! used by the blocking multi-queue fetcher (C7). `addWaitNode` prepends a
//! node; `signalOne` pops the head and releases it; `signalAll` drains the
//! whole list. Guarded by one latch per queue, consulted from both the
//! dispatcher thread (post-commit signalling) and fetcher threads
//! (install/cancel), so the map itself must be thread-safe.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};

/// A single binary signal (capacity-1 semaphore): a fetcher blocks on it,
/// the dispatcher (or a cancellation request) releases it exactly once.
#[derive(Debug, Default)]
pub struct WaitNode {
    signaled: Mutex<bool>,
    condvar: Condvar,
}

impl WaitNode {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Releases the signal. Idempotent: signalling twice is a no-op on the
    /// second call.
    pub fn signal(&self) {
        let mut signaled = self.signaled.lock();
        if !*signaled {
            *signaled = true;
            self.condvar.notify_one();
        }
    }

    /// Blocks until signalled or `deadline` passes. Returns `true` if
    /// signalled, `false` on timeout. Spurious wake-ups are absorbed by the
    /// caller re-checking its own cancellation flag between calls.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut signaled = self.signaled.lock();
        while !*signaled {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let timed_out = self.condvar.wait_for(&mut signaled, deadline - now).timed_out();
            if timed_out && !*signaled {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Default)]
struct QueueWaitList {
    nodes: Mutex<VecDeque<Arc<WaitNode>>>,
}

impl QueueWaitList {
    fn add_wait_node(&self) -> Arc<WaitNode> {
        let node = WaitNode::new();
        self.nodes.lock().push_front(node.clone());
        node
    }

    fn signal_one(&self) -> bool {
        let Some(node) = self.nodes.lock().pop_front() else {
            return false;
        };
        node.signal();
        true
    }

    fn signal_all(&self) {
        let drained: Vec<_> = self.nodes.lock().drain(..).collect();
        for node in drained {
            node.signal();
        }
    }

    /// Removes a specific node (used when a fetcher gives up waiting on
    /// this queue without having been signalled, e.g. cancellation or a hit
    /// on another queue in a multi-queue fetch).
    fn remove(&self, node: &Arc<WaitNode>) {
        self.nodes.lock().retain(|n| !Arc::ptr_eq(n, node));
    }
}

/// Map of queue name to its wait list. Cheap to clone (shares the map).
#[derive(Debug, Clone, Default)]
pub struct WaitGraph {
    queues: Arc<DashMap<String, Arc<QueueWaitList>>>,
}

impl WaitGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn list_for(&self, queue: &str) -> Arc<QueueWaitList> {
        self.queues
            .entry(queue.to_string())
            .or_insert_with(|| Arc::new(QueueWaitList::default()))
            .clone()
    }

    /// `addWaitNode`: registers a waiter on `queue`, returning a handle the
    /// caller blocks on and must later [`WaitGraph::remove`] if it gives up
    /// without being signalled.
    #[must_use]
    pub fn add_wait_node(&self, queue: &str) -> Arc<WaitNode> {
        self.list_for(queue).add_wait_node()
    }

    /// Removes a previously-added node that was never signalled (lost a
    /// race on another queue, or the fetch was cancelled).
    pub fn remove(&self, queue: &str, node: &Arc<WaitNode>) {
        self.list_for(queue).remove(node);
    }

    /// `signalOne`: wakes exactly one waiter on `queue`, if any. Returns
    /// whether a waiter was present.
    pub fn signal_one(&self, queue: &str) -> bool {
        self.list_for(queue).signal_one()
    }

    /// `signalAll`: wakes every current waiter on `queue`.
    pub fn signal_all(&self, queue: &str) {
        self.list_for(queue).signal_all();
    }

    /// Blocks on `node` up to `timeout`, returning whether it was signalled.
    pub fn wait(node: &WaitNode, timeout: Duration) -> bool {
        node.wait_until(Instant::now() + timeout)
    }
}
