//! Commands (C8): the typed mutation catalogue the dispatcher executes
//! against the [`StateStore`]. A tagged-union `Command`, rather than the
//! teacher's trait-object `Operation`, since every variant here is a
//! fixed-shape data command with no per-kind behavior to virtualize --
//! `Command::apply` is one `match`, not a vtable dispatch.
//!
//! Commands are idempotent at the "entry absent" boundary (§4.6): applying
//! one to a key that no longer exists (raced against eviction, or never
//! created) is a silent no-op rather than an error.

use std::time::Duration;

use jobstore_core::{Job, JobKey, MonotonicTime, ServerContext, StateRecord};

use crate::store::StateStore;

/// One mutation to apply to the store, in the order it appears within its
/// enclosing transaction.
#[derive(Debug, Clone)]
pub enum Command {
    JobCreate {
        job: Job,
        expire_in: Option<Duration>,
    },
    JobSetParameter {
        key: JobKey,
        name: String,
        value: String,
    },
    /// `addState`: appends to history, current state unchanged.
    JobAddState {
        key: JobKey,
        record: StateRecord,
    },
    /// `setState`: appends to history and promotes it to current.
    JobSetState {
        key: JobKey,
        record: StateRecord,
    },
    JobExpire {
        key: JobKey,
        now: Option<MonotonicTime>,
        expire_in: Option<Duration>,
    },
    JobDelete {
        key: JobKey,
    },
    QueueEnqueue {
        queue: String,
        job: JobKey,
    },
    CounterIncrementBy {
        name: String,
        value: i64,
    },
    CounterIncrementByWithExpiry {
        name: String,
        value: i64,
        now: MonotonicTime,
        expire_in: Duration,
    },
    SortedSetAdd {
        name: String,
        value: String,
        score: f64,
    },
    SortedSetAddRange {
        name: String,
        entries: Vec<(String, f64)>,
    },
    SortedSetRemove {
        name: String,
        value: String,
    },
    SortedSetDelete {
        name: String,
    },
    SortedSetExpire {
        name: String,
        now: Option<MonotonicTime>,
        expire_in: Option<Duration>,
    },
    ListInsert {
        name: String,
        value: String,
    },
    ListRemoveAll {
        name: String,
        value: String,
    },
    ListTrim {
        name: String,
        from: usize,
        to: usize,
    },
    ListExpire {
        name: String,
        now: Option<MonotonicTime>,
        expire_in: Option<Duration>,
    },
    HashSetRange {
        name: String,
        fields: Vec<(String, String)>,
    },
    HashRemove {
        name: String,
    },
    HashExpire {
        name: String,
        now: Option<MonotonicTime>,
        expire_in: Option<Duration>,
    },
    ServerAnnounce {
        id: String,
        context: ServerContext,
        now: MonotonicTime,
    },
    ServerHeartbeat {
        id: String,
        now: MonotonicTime,
    },
    ServerDelete {
        id: String,
    },
    ServerDeleteInactive {
        now: MonotonicTime,
        timeout: Duration,
    },
}

impl Command {
    /// Applies this command to `store`. `max_history` and `cap_expiry` come
    /// from [`crate::config::EngineConfig`] -- commands themselves carry no
    /// configuration, only data, so the same command value is replayable
    /// against stores configured differently (useful in tests).
    pub fn apply(self, store: &mut StateStore, max_history: usize, cap_expiry: impl Fn(Duration) -> Duration) {
        match self {
            Command::JobCreate { job, expire_in } => store.jobs.create(job, expire_in),
            Command::JobSetParameter { key, name, value } => store.jobs.set_parameter(key, name, value),
            Command::JobAddState { key, record } => store.jobs.add_state(key, record, max_history),
            Command::JobSetState { key, record } => store.jobs.set_state(key, record, max_history),
            Command::JobExpire { key, now, expire_in } => {
                // `jobCreate` is never capped, but a later `jobExpire` is --
                // apply the cap here, at the single call site that knows it.
                store.jobs.expire(key, now, expire_in.map(&cap_expiry));
            }
            Command::JobDelete { key } => {
                store.jobs.delete(key);
            }
            Command::QueueEnqueue { queue, job } => store.queues.enqueue(&queue, job),
            Command::CounterIncrementBy { name, value } => {
                store.counters.increment_by(&name, value);
            }
            Command::CounterIncrementByWithExpiry { name, value, now, expire_in } => {
                // Counters are never subject to max_expiration_time (§4.2).
                store.counters.increment_by_with_expiry(&name, value, now, expire_in);
            }
            Command::SortedSetAdd { name, value, score } => store.sorted_sets.add(&name, value, score),
            Command::SortedSetAddRange { name, entries } => store.sorted_sets.add_range(&name, entries),
            Command::SortedSetRemove { name, value } => store.sorted_sets.remove(&name, &value),
            Command::SortedSetDelete { name } => store.sorted_sets.delete(&name),
            Command::SortedSetExpire { name, now, expire_in } => {
                store.sorted_sets.expire(&name, now, expire_in, cap_expiry);
            }
            Command::ListInsert { name, value } => store.lists.insert(&name, value),
            Command::ListRemoveAll { name, value } => {
                store.lists.remove_all(&name, &value);
            }
            Command::ListTrim { name, from, to } => store.lists.trim(&name, from, to),
            Command::ListExpire { name, now, expire_in } => {
                store.lists.expire(&name, now, expire_in, cap_expiry);
            }
            Command::HashSetRange { name, fields } => store.hashes.set_range(&name, fields),
            Command::HashRemove { name } => store.hashes.remove(&name),
            Command::HashExpire { name, now, expire_in } => {
                store.hashes.expire(&name, now, expire_in, cap_expiry);
            }
            Command::ServerAnnounce { id, context, now } => store.servers.announce(id, context, now),
            Command::ServerHeartbeat { id, now } => store.servers.heartbeat(&id, now),
            Command::ServerDelete { id } => {
                store.servers.delete(&id);
            }
            Command::ServerDeleteInactive { now, timeout } => {
                store.servers.delete_inactive(now, timeout);
            }
        }
    }
}

/// `persist` for any expirable kind: clears `expire_at` by expiring with
/// both `now` and `expire_in` absent (§4.2).
#[must_use]
pub fn persist_job(key: JobKey) -> Command {
    Command::JobExpire { key, now: None, expire_in: None }
}

#[must_use]
pub fn persist_hash(name: impl Into<String>) -> Command {
    Command::HashExpire { name: name.into(), now: None, expire_in: None }
}

#[must_use]
pub fn persist_list(name: impl Into<String>) -> Command {
    Command::ListExpire { name: name.into(), now: None, expire_in: None }
}

#[must_use]
pub fn persist_sorted_set(name: impl Into<String>) -> Command {
    Command::SortedSetExpire { name: name.into(), now: None, expire_in: None }
}
