//! Transaction (C6): a client-side, append-only buffer of commands plus
//! the set of queue names enqueued into during the transaction. Commit
//! submits a single closure to the dispatcher (C5) that executes every
//! command in order, then -- only on success -- signals one waiter per
//! distinct queue touched (C4). Single-use: committing consumes the
//! transaction.

use std::collections::BTreeSet;
use std::time::Duration;

use jobstore_core::{Job, JobKey, MonotonicTime, ServerContext, StateRecord};

use crate::commands::{self, Command};
use crate::config::EngineConfig;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::wait_graph::WaitGraph;

/// Append-only buffer of commands, built up by the caller and committed
/// exactly once.
#[derive(Debug, Default)]
pub struct Transaction {
    commands: Vec<Command>,
    touched_queues: BTreeSet<String>,
}

impl Transaction {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_create(&mut self, job: Job, expire_in: Option<Duration>) -> &mut Self {
        self.commands.push(Command::JobCreate { job, expire_in });
        self
    }

    pub fn job_set_parameter(&mut self, key: JobKey, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.commands.push(Command::JobSetParameter { key, name: name.into(), value: value.into() });
        self
    }

    pub fn job_add_state(&mut self, key: JobKey, record: StateRecord) -> &mut Self {
        self.commands.push(Command::JobAddState { key, record });
        self
    }

    pub fn job_set_state(&mut self, key: JobKey, record: StateRecord) -> &mut Self {
        self.commands.push(Command::JobSetState { key, record });
        self
    }

    pub fn job_expire(&mut self, key: JobKey, now: Option<MonotonicTime>, expire_in: Option<Duration>) -> &mut Self {
        self.commands.push(Command::JobExpire { key, now, expire_in });
        self
    }

    pub fn job_persist(&mut self, key: JobKey) -> &mut Self {
        self.commands.push(commands::persist_job(key));
        self
    }

    pub fn job_delete(&mut self, key: JobKey) -> &mut Self {
        self.commands.push(Command::JobDelete { key });
        self
    }

    /// Enqueues `job` onto `queue`. Queue names touched by `enqueue` are
    /// tracked for post-commit signalling.
    pub fn queue_enqueue(&mut self, queue: impl Into<String>, job: JobKey) -> &mut Self {
        let queue = queue.into();
        self.touched_queues.insert(queue.clone());
        self.commands.push(Command::QueueEnqueue { queue, job });
        self
    }

    pub fn counter_increment_by(&mut self, name: impl Into<String>, value: i64) -> &mut Self {
        self.commands.push(Command::CounterIncrementBy { name: name.into(), value });
        self
    }

    pub fn counter_increment_by_with_expiry(
        &mut self,
        name: impl Into<String>,
        value: i64,
        now: MonotonicTime,
        expire_in: Duration,
    ) -> &mut Self {
        self.commands.push(Command::CounterIncrementByWithExpiry { name: name.into(), value, now, expire_in });
        self
    }

    pub fn sorted_set_add(&mut self, name: impl Into<String>, value: impl Into<String>, score: f64) -> &mut Self {
        self.commands.push(Command::SortedSetAdd { name: name.into(), value: value.into(), score });
        self
    }

    pub fn sorted_set_add_range(&mut self, name: impl Into<String>, entries: Vec<(String, f64)>) -> &mut Self {
        self.commands.push(Command::SortedSetAddRange { name: name.into(), entries });
        self
    }

    pub fn sorted_set_remove(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.commands.push(Command::SortedSetRemove { name: name.into(), value: value.into() });
        self
    }

    pub fn sorted_set_delete(&mut self, name: impl Into<String>) -> &mut Self {
        self.commands.push(Command::SortedSetDelete { name: name.into() });
        self
    }

    pub fn sorted_set_expire(
        &mut self,
        name: impl Into<String>,
        now: Option<MonotonicTime>,
        expire_in: Option<Duration>,
    ) -> &mut Self {
        self.commands.push(Command::SortedSetExpire { name: name.into(), now, expire_in });
        self
    }

    pub fn sorted_set_persist(&mut self, name: impl Into<String>) -> &mut Self {
        self.commands.push(commands::persist_sorted_set(name));
        self
    }

    pub fn list_insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.commands.push(Command::ListInsert { name: name.into(), value: value.into() });
        self
    }

    pub fn list_remove_all(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.commands.push(Command::ListRemoveAll { name: name.into(), value: value.into() });
        self
    }

    pub fn list_trim(&mut self, name: impl Into<String>, from: usize, to: usize) -> &mut Self {
        self.commands.push(Command::ListTrim { name: name.into(), from, to });
        self
    }

    pub fn list_expire(
        &mut self,
        name: impl Into<String>,
        now: Option<MonotonicTime>,
        expire_in: Option<Duration>,
    ) -> &mut Self {
        self.commands.push(Command::ListExpire { name: name.into(), now, expire_in });
        self
    }

    pub fn list_persist(&mut self, name: impl Into<String>) -> &mut Self {
        self.commands.push(commands::persist_list(name));
        self
    }

    pub fn hash_set_range(&mut self, name: impl Into<String>, fields: Vec<(String, String)>) -> &mut Self {
        self.commands.push(Command::HashSetRange { name: name.into(), fields });
        self
    }

    pub fn hash_remove(&mut self, name: impl Into<String>) -> &mut Self {
        self.commands.push(Command::HashRemove { name: name.into() });
        self
    }

    pub fn hash_expire(
        &mut self,
        name: impl Into<String>,
        now: Option<MonotonicTime>,
        expire_in: Option<Duration>,
    ) -> &mut Self {
        self.commands.push(Command::HashExpire { name: name.into(), now, expire_in });
        self
    }

    pub fn hash_persist(&mut self, name: impl Into<String>) -> &mut Self {
        self.commands.push(commands::persist_hash(name));
        self
    }

    pub fn server_announce(&mut self, id: impl Into<String>, context: ServerContext, now: MonotonicTime) -> &mut Self {
        self.commands.push(Command::ServerAnnounce { id: id.into(), context, now });
        self
    }

    pub fn server_heartbeat(&mut self, id: impl Into<String>, now: MonotonicTime) -> &mut Self {
        self.commands.push(Command::ServerHeartbeat { id: id.into(), now });
        self
    }

    pub fn server_delete(&mut self, id: impl Into<String>) -> &mut Self {
        self.commands.push(Command::ServerDelete { id: id.into() });
        self
    }

    pub fn server_delete_inactive(&mut self, now: MonotonicTime, timeout: Duration) -> &mut Self {
        self.commands.push(Command::ServerDeleteInactive { now, timeout });
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Commits every buffered command, in order, on the dispatcher thread.
    /// Only on success does it signal one waiter per distinct queue
    /// enqueued into during this transaction.
    pub fn commit(self, dispatcher: &Dispatcher, wait_graph: &WaitGraph, config: &EngineConfig) -> Result<()> {
        let Self { commands, touched_queues } = self;
        let max_history = config.max_state_history_length;
        let cap = config.clone();

        dispatcher.submit(move |store| {
            for command in commands {
                command.apply(store, max_history, |d| cap.cap_expiry(d));
            }
        })?;

        for queue in &touched_queues {
            wait_graph.signal_one(queue);
        }
        Ok(())
    }
}
