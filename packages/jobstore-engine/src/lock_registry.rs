//! Lock Registry (C3): reentrant, multi-waiter named locks with bounded-wait
//! acquisition and safe finalization. Consulted directly from submitter
//! threads (not funneled through the dispatcher), so it is its own
//! thread-safe structure -- a `DashMap` of per-slot monitors, each a
//! `parking_lot::{Mutex, Condvar}` pair.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};

use crate::error::{EngineError, Result};

#[derive(Debug, Default)]
struct LockState {
    owner: Option<String>,
    level: u32,
    /// Count of distinct interested parties: 1 for the current owner (at
    /// any reentrancy depth) plus one per blocked waiter. Reaches zero only
    /// once the owner has released every level and no waiter remains.
    ref_count: u32,
    finalized: bool,
}

#[derive(Debug, Default)]
struct LockSlot {
    state: Mutex<LockState>,
    condvar: Condvar,
}

/// Named, reentrant, multi-waiter lock registry. Clone is cheap: it shares
/// the underlying map (mirrors the teacher's `Arc`-wrapped shared-state
/// handles, e.g. `ShutdownController`'s internal `Arc<AtomicU64>`).
#[derive(Debug, Clone, Default)]
pub struct LockRegistry {
    slots: Arc<DashMap<String, Arc<LockSlot>>>,
}

impl LockRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires (or reentrantly re-acquires) the named lock for `owner`,
    /// blocking up to `timeout`. Returns a [`LockGuard`] whose drop releases
    /// exactly one level of ownership.
    pub fn acquire(&self, name: &str, owner: &str, timeout: Duration) -> Result<LockGuard> {
        let deadline = Instant::now() + timeout;
        // Tracks whether this call has already counted itself in
        // `ref_count` as a waiter -- `ref_count` is a count of distinct
        // interested parties (the current owner, plus blocked waiters), not
        // of acquire calls, so a reentrant re-acquire or a waiter that loops
        // back around must not bump it again.
        let mut waiting = false;
        loop {
            let slot = self
                .slots
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(LockSlot::default()))
                .clone();
            let mut state = slot.state.lock();

            if state.finalized {
                // Observed a slot mid-teardown (raced with `release`'s
                // removal); drop and retry with a fresh lookup.
                drop(state);
                continue;
            }

            if state.owner.is_none() {
                state.owner = Some(owner.to_string());
                state.level = 1;
                if !waiting {
                    state.ref_count += 1;
                }
                drop(state);
                return Ok(LockGuard {
                    registry: self.clone(),
                    name: name.to_string(),
                    owner: owner.to_string(),
                });
            }

            if state.owner.as_deref() == Some(owner) {
                state.level += 1;
                drop(state);
                return Ok(LockGuard {
                    registry: self.clone(),
                    name: name.to_string(),
                    owner: owner.to_string(),
                });
            }

            let now = Instant::now();
            if now >= deadline {
                if waiting {
                    state.ref_count -= 1;
                }
                drop(state);
                tracing::debug!(lock = name, owner, "lock acquire timed out");
                return Err(EngineError::LockTimeout(name.to_string()));
            }
            if !waiting {
                state.ref_count += 1;
                waiting = true;
            }
            let remaining = deadline - now;
            slot.condvar.wait_for(&mut state, remaining);
            // Loop back around and re-check ownership and the deadline
            // regardless of why we woke -- covers both a real timeout and a
            // spurious wakeup.
        }
    }

    /// Releases one level of ownership held by `owner` on `name`. A
    /// programming error (releasing a lock not held, or held by someone
    /// else) is fatal -- the spec calls this out explicitly as a bug in the
    /// caller, not a recoverable condition.
    fn release(&self, name: &str, owner: &str) {
        let Some(slot) = self.slots.get(name).map(|entry| entry.clone()) else {
            panic!("releasing lock {name:?} that is not held");
        };
        let mut state = slot.state.lock();
        assert!(
            state.owner.as_deref() == Some(owner),
            "releasing lock {name:?} not owned by {owner:?}"
        );

        state.level -= 1;
        if state.level == 0 {
            state.owner = None;
            state.ref_count -= 1;
            if state.ref_count == 0 {
                state.finalized = true;
                drop(state);
                self.slots.remove(name);
            } else {
                drop(state);
                slot.condvar.notify_one();
            }
        }
    }

    /// Snapshot of held/waited-on lock names, for diagnostics.
    #[must_use]
    pub fn held_locks(&self) -> HashMap<String, String> {
        self.slots
            .iter()
            .filter_map(|entry| {
                let state = entry.value().state.lock();
                state.owner.clone().map(|owner| (entry.key().clone(), owner))
            })
            .collect()
    }
}

/// RAII handle returned by [`LockRegistry::acquire`]. Dropping it releases
/// one reentrancy level; the lock becomes vacant once every matching
/// `acquire` has a dropped guard.
#[derive(Debug)]
pub struct LockGuard {
    registry: LockRegistry,
    name: String,
    owner: String,
}

impl LockGuard {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.registry.release(&self.name, &self.owner);
    }
}
