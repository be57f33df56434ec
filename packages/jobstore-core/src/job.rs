//! Job entity (§3).

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::job_key::JobKey;
use crate::time::MonotonicTime;

/// A single state transition record, appended to a job's history and
/// optionally promoted to the job's current state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateRecord {
    pub name: String,
    pub reason: Option<String>,
    /// Ordered list of name -> value pairs attached to this state record.
    /// Insertion order is preserved (unlike the parameter bag).
    pub data: Vec<(String, String)>,
    pub created_at: MonotonicTime,
}

impl StateRecord {
    #[must_use]
    pub fn new(name: impl Into<String>, created_at: MonotonicTime) -> Self {
        Self {
            name: name.into(),
            reason: None,
            data: Vec::new(),
            created_at,
        }
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: Vec<(String, String)>) -> Self {
        self.data = data;
        self
    }
}

/// Bounded, oldest-first history of state records (I7: never exceeds its
/// cap; inserting beyond the cap evicts the oldest entry).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateHistory {
    records: VecDeque<StateRecord>,
}

impl StateHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `record`, evicting the oldest entry if `cap` is exceeded.
    /// `cap == 0` means no history is retained at all.
    pub fn push(&mut self, record: StateRecord, cap: usize) {
        if cap == 0 {
            self.records.clear();
            return;
        }
        self.records.push_back(record);
        while self.records.len() > cap {
            self.records.pop_front();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Oldest-first iteration.
    pub fn iter(&self) -> impl Iterator<Item = &StateRecord> {
        self.records.iter()
    }
}

/// Mapping parameter-name -> string. Uniqueness enforced; insertion order
/// is not meaningful (§3: "insertion order irrelevant, uniqueness
/// required").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterBag {
    values: std::collections::BTreeMap<String, String>,
}

impl ParameterBag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A job: created when it arrives, destroyed on explicit delete or
/// expiration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub key: JobKey,
    /// Opaque invocation payload, passed through uninterpreted.
    pub invocation: Vec<u8>,
    pub parameters: ParameterBag,
    pub current_state: Option<StateRecord>,
    pub history: StateHistory,
    pub created_at: MonotonicTime,
    pub expire_at: Option<MonotonicTime>,
}

impl Job {
    #[must_use]
    pub fn new(key: JobKey, invocation: Vec<u8>, created_at: MonotonicTime) -> Self {
        Self {
            key,
            invocation,
            parameters: ParameterBag::new(),
            current_state: None,
            history: StateHistory::new(),
            created_at,
            expire_at: None,
        }
    }

    /// Rewires the current-state pointer and appends to history, capped at
    /// `max_history`. Does not touch the state index — that is the state
    /// store's responsibility (it must also move the job between index
    /// buckets atomically with this call).
    pub fn set_state(&mut self, record: StateRecord, max_history: usize) {
        self.history.push(record.clone(), max_history);
        self.current_state = Some(record);
    }

    /// Appends `record` to history without disturbing `current_state` (the
    /// `addState` command, distinct from `setState`).
    pub fn add_state(&mut self, record: StateRecord, max_history: usize) {
        self.history.push(record, max_history);
    }
}
