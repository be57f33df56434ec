//! Dispatcher (C5): single background thread that owns write access to the
//! [`StateStore`] and is the only thread ever allowed to mutate it. Writes
//! are boxed closures sent over a `crossbeam-channel` MPSC channel; each
//! submitter blocks on a one-shot `parking_lot` signal attached to its own
//! command. Reads run either through the same channel (sequential mode,
//! strict linearization) or inline on the caller's thread under the shared
//! `RwLock`'s read side (concurrent-read mode) -- see [`ReadMode`]. Either
//! way, a writer never interleaves with a reader: the dispatcher thread
//! takes the lock's write side for the duration of every command.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::{Condvar, Mutex, RwLock};

use crate::clock::MonotonicClock;
use crate::error::{EngineError, Result};
use crate::store::StateStore;

/// How read-only commands are executed relative to the writer thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Reads are funnelled through the dispatcher thread like writes --
    /// strict linearization, at the cost of queueing behind writes.
    #[default]
    Sequential,
    /// Reads run inline on the caller's thread, taking the shared lock's
    /// read side, while writes still take its exclusive side.
    ConcurrentRead,
}

type Job = Box<dyn FnOnce(&mut StateStore) + Send>;

enum Envelope {
    Run(Job),
    Shutdown,
}

/// One-shot slot a submitter blocks on; fulfilled by the job closure once
/// it has run on the dispatcher thread. Returns `None` on timeout -- the
/// job keeps running to completion regardless (§7).
struct ResultSlot<T> {
    state: Mutex<Option<std::result::Result<T, String>>>,
    condvar: Condvar,
}

impl<T> ResultSlot<T> {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(None),
            condvar: Condvar::new(),
        })
    }

    fn fulfil(&self, result: std::result::Result<T, String>) {
        let mut state = self.state.lock();
        *state = Some(result);
        self.condvar.notify_all();
    }

    fn wait(&self, timeout: Duration) -> Option<std::result::Result<T, String>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while state.is_none() {
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            self.condvar.wait_for(&mut state, deadline - now);
        }
        state.take()
    }
}

/// Handle shared between submitter threads and the dispatcher thread.
/// Cloning is cheap: it shares the channel and the store's lock.
#[derive(Clone)]
pub struct Dispatcher {
    sender: Sender<Envelope>,
    read_mode: ReadMode,
    store: Arc<RwLock<StateStore>>,
    command_timeout: Option<Duration>,
    corrupted: Arc<AtomicBool>,
}

/// Owns the worker thread's join handle; dropping it does not join --
/// callers that care about clean shutdown should call
/// [`DispatcherHandle::join`] after [`Dispatcher::shutdown`].
pub struct DispatcherHandle {
    thread: Option<JoinHandle<()>>,
}

impl DispatcherHandle {
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Dispatcher {
    /// Spawns the worker thread. `eviction_interval` bounds how long the
    /// thread blocks waiting for work before it runs an eviction sweep
    /// unconditionally.
    #[must_use]
    pub fn spawn(
        store: StateStore,
        clock: Arc<dyn MonotonicClock>,
        read_mode: ReadMode,
        command_timeout: Option<Duration>,
        eviction_interval: Duration,
    ) -> (Self, DispatcherHandle) {
        let (sender, receiver): (Sender<Envelope>, Receiver<Envelope>) = bounded(1024);
        let store = Arc::new(RwLock::new(store));
        let corrupted = Arc::new(AtomicBool::new(false));

        let thread_store = store.clone();
        let thread_corrupted = corrupted.clone();
        let thread = std::thread::Builder::new()
            .name("jobstore-dispatcher".to_string())
            .spawn(move || {
                run_loop(&thread_store, &clock, &receiver, eviction_interval, &thread_corrupted);
            })
            .expect("failed to spawn dispatcher thread");

        (
            Self {
                sender,
                read_mode,
                store,
                command_timeout,
                corrupted,
            },
            DispatcherHandle { thread: Some(thread) },
        )
    }

    /// Submits a write to run on the dispatcher thread. Blocks on the
    /// command's completion signal up to `command_timeout`; on timeout
    /// returns [`EngineError::DispatcherTimeout`] while the callback keeps
    /// running in the background -- a timed-out submitter does not cancel
    /// its own command (§7).
    pub fn submit<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut StateStore) + Send + 'static,
    {
        if self.corrupted.load(Ordering::SeqCst) {
            return Err(EngineError::DispatcherCorrupted(
                "dispatcher terminated after a prior command panicked".to_string(),
            ));
        }

        let slot = ResultSlot::new();
        let slot_for_job = slot.clone();
        let job: Job = Box::new(move |store| {
            match panic::catch_unwind(AssertUnwindSafe(|| f(store))) {
                Ok(()) => slot_for_job.fulfil(Ok(())),
                Err(payload) => slot_for_job.fulfil(Err(panic_message(&payload))),
            }
        });

        self.sender
            .send(Envelope::Run(job))
            .map_err(|_| EngineError::DispatcherCorrupted("worker thread is gone".to_string()))?;

        let timeout = self.command_timeout.unwrap_or(Duration::from_secs(i64::MAX as u64 / 1_000_000_000));
        match slot.wait(timeout) {
            Some(Ok(())) => Ok(()),
            Some(Err(message)) => {
                self.corrupted.store(true, Ordering::SeqCst);
                tracing::error!(error = %message, "dispatcher command panicked; marking corrupted");
                Err(EngineError::DispatcherCorrupted(message))
            }
            None => {
                tracing::warn!(?timeout, "dispatcher submission timed out; command remains in flight");
                Err(EngineError::DispatcherTimeout(timeout))
            }
        }
    }

    /// Runs `f` against the store and returns its result, choosing
    /// sequential or concurrent-read execution per the configured
    /// [`ReadMode`]. In concurrent-read mode this runs inline on the
    /// caller's thread under the lock's read side; in sequential mode it is
    /// queued behind every earlier-submitted write so it observes them in
    /// admission order, the same as a write would.
    pub fn read<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&StateStore) -> T + Send + 'static,
        T: Send + 'static,
    {
        if self.corrupted.load(Ordering::SeqCst) {
            return Err(EngineError::DispatcherCorrupted(
                "dispatcher terminated after a prior command panicked".to_string(),
            ));
        }

        match self.read_mode {
            ReadMode::ConcurrentRead => {
                let guard = self.store.read();
                Ok(f(&guard))
            }
            ReadMode::Sequential => {
                let slot = ResultSlot::new();
                let slot_for_job = slot.clone();
                let job: Job = Box::new(move |store| {
                    match panic::catch_unwind(AssertUnwindSafe(|| f(&*store))) {
                        Ok(value) => slot_for_job.fulfil(Ok(value)),
                        Err(payload) => slot_for_job.fulfil(Err(panic_message(&payload))),
                    }
                });
                self.sender
                    .send(Envelope::Run(job))
                    .map_err(|_| EngineError::DispatcherCorrupted("worker thread is gone".to_string()))?;

                let timeout = self.command_timeout.unwrap_or(Duration::from_secs(i64::MAX as u64 / 1_000_000_000));
                match slot.wait(timeout) {
                    Some(Ok(value)) => Ok(value),
                    Some(Err(message)) => {
                        self.corrupted.store(true, Ordering::SeqCst);
                        Err(EngineError::DispatcherCorrupted(message))
                    }
                    None => Err(EngineError::DispatcherTimeout(timeout)),
                }
            }
        }
    }

    pub fn shutdown(&self) {
        let _ = self.sender.send(Envelope::Shutdown);
    }

    #[must_use]
    pub fn is_corrupted(&self) -> bool {
        self.corrupted.load(Ordering::SeqCst)
    }
}

fn run_loop(
    store: &Arc<RwLock<StateStore>>,
    clock: &Arc<dyn MonotonicClock>,
    receiver: &Receiver<Envelope>,
    eviction_interval: Duration,
    corrupted: &Arc<AtomicBool>,
) {
    loop {
        match receiver.recv_timeout(eviction_interval) {
            Ok(Envelope::Run(job)) => {
                let mut guard = store.write();
                job(&mut guard);
            }
            Ok(Envelope::Shutdown) => {
                tracing::debug!("dispatcher received shutdown signal");
                break;
            }
            Err(RecvTimeoutError::Timeout) => {
                let mut guard = store.write();
                let report = guard.evict_expired_entries(clock.now());
                let _ = report;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
        if corrupted.load(Ordering::SeqCst) {
            tracing::error!("dispatcher marked corrupted by a panicking command");
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "command panicked with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VirtualClock;
    use jobstore_core::{Job as DomainJob, JobKey, MonotonicTime};

    fn spawn_test_dispatcher(read_mode: ReadMode) -> (Dispatcher, DispatcherHandle) {
        let clock: Arc<dyn MonotonicClock> = Arc::new(VirtualClock::new());
        Dispatcher::spawn(
            StateStore::new(),
            clock,
            read_mode,
            Some(Duration::from_secs(5)),
            Duration::from_millis(20),
        )
    }

    #[test]
    fn submit_mutates_store_on_worker_thread() {
        let (dispatcher, handle) = spawn_test_dispatcher(ReadMode::Sequential);
        dispatcher
            .submit(|store| {
                store.jobs.create(
                    DomainJob::new(JobKey::Counter(1), vec![], MonotonicTime::from_ticks_ns(0)),
                    None,
                );
            })
            .unwrap();

        let exists = dispatcher.read(|store| store.jobs.contains(JobKey::Counter(1))).unwrap();
        assert!(exists);

        dispatcher.shutdown();
        handle.join();
    }

    #[test]
    fn concurrent_read_mode_sees_committed_writes() {
        let (dispatcher, handle) = spawn_test_dispatcher(ReadMode::ConcurrentRead);
        dispatcher.submit(|store| { store.counters.increment_by("c", 5); }).unwrap();
        let value = dispatcher.read(|store| store.counters.get("c")).unwrap();
        assert_eq!(value, 5);

        dispatcher.shutdown();
        handle.join();
    }

    #[test]
    fn panicking_command_marks_dispatcher_corrupted() {
        let (dispatcher, handle) = spawn_test_dispatcher(ReadMode::Sequential);
        let result = dispatcher.submit(|_store| panic!("boom"));
        assert!(matches!(result, Err(EngineError::DispatcherCorrupted(_))));
        assert!(dispatcher.is_corrupted());

        let after = dispatcher.submit(|_store| {});
        assert!(matches!(after, Err(EngineError::DispatcherCorrupted(_))));

        dispatcher.shutdown();
        handle.join();
    }

    #[test]
    fn eviction_sweep_runs_without_any_submissions() {
        let (dispatcher, handle) = spawn_test_dispatcher(ReadMode::Sequential);
        // No submissions at all -- just confirm the idle loop doesn't hang
        // or panic while the eviction timer fires a few times.
        std::thread::sleep(Duration::from_millis(80));
        dispatcher.submit(|_store| {}).unwrap();

        dispatcher.shutdown();
        handle.join();
    }
}
