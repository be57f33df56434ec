//! Auxiliary data structure value shapes (§3): hash, list, sorted set,
//! counter, server. Queue contents are job keys managed directly by the
//! state store and do not need a dedicated value type here.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::time::MonotonicTime;

/// A `{value, score}` pair in a sorted set, ordered by score ascending,
/// ties broken by value under the configured comparer (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortedSetEntry {
    pub value: String,
    pub score: f64,
}

impl SortedSetEntry {
    #[must_use]
    pub fn new(value: impl Into<String>, score: f64) -> Self {
        Self {
            value: value.into(),
            score,
        }
    }

    #[must_use]
    pub fn ordered_score(&self) -> OrderedFloat<f64> {
        OrderedFloat(self.score)
    }
}

/// Execution context announced by a worker process (§3 Server).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerContext {
    pub queues: Vec<String>,
    pub worker_count: u32,
}

/// A registered worker server: announced once, heart-beaten periodically,
/// reaped if its heartbeat goes stale past a caller-supplied timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerEntry {
    pub id: String,
    pub context: ServerContext,
    pub started_at: MonotonicTime,
    pub heartbeat_at: MonotonicTime,
}

impl ServerEntry {
    #[must_use]
    pub fn new(id: impl Into<String>, context: ServerContext, now: MonotonicTime) -> Self {
        Self {
            id: id.into(),
            context,
            started_at: now,
            heartbeat_at: now,
        }
    }
}
