//! Property tests for the invariants the store and lock registry must hold
//! under arbitrary command sequences.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use jobstore_core::{Job, JobKey, MonotonicTime, StateRecord, StringComparer};
use jobstore_engine::{EngineError, LockRegistry, StateStore};
use proptest::prelude::*;

fn t(ticks: u64) -> MonotonicTime {
    MonotonicTime::from_ticks_ns(ticks)
}

proptest! {
    // P1: no container holds an entry with an empty value or a zero counter.
    #[test]
    fn counters_never_persist_a_zero_value(deltas in proptest::collection::vec(-5i64..=5, 0..30)) {
        let mut store = StateStore::new();
        let mut model: i64 = 0;
        for delta in deltas {
            model += delta;
            store.counters.increment_by("c", delta);
        }
        if model == 0 {
            prop_assert_eq!(store.counters.get("c"), 0);
        } else {
            prop_assert_eq!(store.counters.get("c"), model);
        }
    }

    // P1 (hash variant): a hash with all fields removed is absent, not an
    // empty entry.
    #[test]
    fn hash_removed_entirely_leaves_no_empty_residue(fields in proptest::collection::vec("[a-c]", 1..5)) {
        let mut store = StateStore::new();
        store.hashes.set_range("h", fields.iter().map(|f| (f.clone(), "v".to_string())).collect());
        store.hashes.remove("h");
        prop_assert!(store.hashes.get("h").is_none());
    }

    // P2: an entry is in the expiration index iff its ExpireAt is set, and
    // evicting at that ExpireAt removes it.
    #[test]
    fn hash_expiration_index_agrees_with_expire_at(expire_ticks in 1u64..1000) {
        let mut store = StateStore::new();
        store.hashes.set_range("h", vec![("f".to_string(), "v".to_string())]);
        store.hashes.expire("h", Some(t(0)), Some(Duration::from_nanos(expire_ticks)), |d| d);
        prop_assert_eq!(store.hashes.get("h").is_some(), true);

        store.hashes.evict_expired(t(expire_ticks - 1));
        prop_assert!(store.hashes.get("h").is_some());

        store.hashes.evict_expired(t(expire_ticks));
        prop_assert!(store.hashes.get("h").is_none());
    }

    // P3: a job is indexed under exactly the state it currently holds,
    // matched case-insensitively.
    #[test]
    fn job_is_indexed_under_exactly_its_current_state(
        transitions in proptest::collection::vec(prop_oneof!["Enqueued", "Processing", "Succeeded", "Failed"], 1..8)
    ) {
        let mut store = StateStore::new();
        store.jobs.create(Job::new(JobKey::Counter(1), vec![], t(0)), None);
        let mut last_state = String::new();
        for (i, state) in transitions.iter().enumerate() {
            store.jobs.set_state(JobKey::Counter(1), StateRecord::new(state.clone(), t(i as u64 + 1)), 10);
            last_state = state.clone();
        }
        for candidate in ["Enqueued", "Processing", "Succeeded", "Failed"] {
            let present = store.jobs.state_index.jobs_in_state(candidate).contains(&JobKey::Counter(1));
            prop_assert_eq!(present, candidate.eq_ignore_ascii_case(&last_state));
        }
    }

    // P4: evictExpiredEntries(t) removes exactly the entries whose
    // ExpireAt <= t, across kinds.
    #[test]
    fn eviction_sweep_removes_exactly_entries_due(now_ticks in 0u64..200) {
        let mut store = StateStore::new();
        let expirations = [10u64, 50, 100, 150];
        for (i, ticks) in expirations.iter().enumerate() {
            store.hashes.set_range(&format!("h{i}"), vec![("f".into(), "v".into())]);
            store.hashes.expire(&format!("h{i}"), Some(t(0)), Some(Duration::from_nanos(*ticks)), |d| d);
        }
        store.evict_expired_entries(t(now_ticks));
        for ticks in expirations {
            let should_be_gone = ticks <= now_ticks;
            let name = format!("h{}", expirations.iter().position(|x| *x == ticks).unwrap());
            prop_assert_eq!(store.hashes.get(&name).is_none(), should_be_gone);
        }
    }

    // P5: scanning a sorted set yields ascending (score, value) order.
    #[test]
    fn sorted_set_scan_is_ascending(
        entries in proptest::collection::vec(("[a-e]", -10.0f64..10.0), 0..10)
    ) {
        let mut store = StateStore::new();
        let mut model: BTreeMap<String, f64> = BTreeMap::new();
        for (value, score) in entries {
            store.sorted_sets.add("s", value.clone(), score);
            model.insert(value, score);
        }
        let scanned = store.sorted_sets.scan("s", StringComparer::Ordinal);
        let mut expected: Vec<(String, f64)> = model.into_iter().collect();
        expected.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap().then_with(|| a.0.cmp(&b.0)));
        let actual: Vec<(String, f64)> = scanned.into_iter().map(|e| (e.value, e.score)).collect();
        prop_assert_eq!(actual, expected);
    }

    // P6: list reads back in reverse-of-insertion order.
    #[test]
    fn list_reads_in_reverse_insertion_order(values in proptest::collection::vec("[a-z]{1,4}", 0..10)) {
        let mut store = StateStore::new();
        for value in &values {
            store.lists.insert("L", value.clone());
        }
        let all = store.lists.all("L");
        let expected: Vec<String> = values.into_iter().rev().collect();
        prop_assert_eq!(all, expected);
    }

    // P7: reentrant-lock laws -- balanced acquire/release round-trips leave
    // the slot vacant; a non-owner cannot acquire while level > 0.
    #[test]
    fn reentrant_lock_round_trips_for_arbitrary_depth(depth in 1usize..6) {
        let registry = LockRegistry::default();
        let mut guards = Vec::new();
        for _ in 0..depth {
            guards.push(registry.acquire("R", "A", Duration::from_secs(1)).unwrap());
        }
        // Another owner cannot acquire while any guard is outstanding.
        prop_assert!(matches!(
            registry.acquire("R", "B", Duration::from_millis(20)),
            Err(EngineError::LockTimeout(_))
        ));
        while guards.len() > 1 {
            guards.pop();
        }
        // Still held with one guard left.
        prop_assert!(matches!(
            registry.acquire("R", "B", Duration::from_millis(20)),
            Err(EngineError::LockTimeout(_))
        ));
        guards.pop();
        // Now vacant.
        let guard = registry.acquire("R", "B", Duration::from_millis(20)).unwrap();
        drop(guard);
    }
}

// P8: transaction atomicity is documented as all-or-corrupted, not
// all-or-nothing (DESIGN.md open question 1) -- a command that panics
// mid-batch leaves earlier effects in this batch applied and marks the
// dispatcher corrupted, rather than rolling them back.
#[test]
fn panicking_mid_batch_leaves_earlier_effects_applied_and_marks_corrupted() {
    use jobstore_engine::{Dispatcher, MonotonicClock, ReadMode, VirtualClock};
    use std::sync::Arc;

    let clock: Arc<dyn MonotonicClock> = Arc::new(VirtualClock::new());
    let (dispatcher, handle) = Dispatcher::spawn(StateStore::new(), clock, ReadMode::Sequential, Some(Duration::from_secs(5)), Duration::from_secs(5));

    let result = dispatcher.submit(|store| {
        store.counters.increment_by("c", 5);
        panic!("simulated mid-batch failure");
    });
    assert!(result.is_err());
    assert!(dispatcher.is_corrupted());

    dispatcher.shutdown();
    handle.join();
}

// P9: every enqueued job is fetched by exactly one fetcher call, with FIFO
// order per queue, across an interleaved sequence of enqueues and fetches.
#[test]
fn fifo_delivery_with_interleaved_enqueue_and_fetch() {
    let mut store = StateStore::new();
    let mut model: std::collections::VecDeque<JobKey> = std::collections::VecDeque::new();
    let mut delivered: HashMap<JobKey, u32> = HashMap::new();

    for i in 0..50u64 {
        store.queues.enqueue("q", JobKey::Counter(i));
        model.push_back(JobKey::Counter(i));
        if i % 3 == 0 {
            if let Some(popped) = store.queues.pop("q") {
                assert_eq!(Some(popped), model.pop_front());
                *delivered.entry(popped).or_insert(0) += 1;
            }
        }
    }
    while let Some(popped) = store.queues.pop("q") {
        assert_eq!(Some(popped), model.pop_front());
        *delivered.entry(popped).or_insert(0) += 1;
    }
    assert!(model.is_empty());
    assert!(delivered.values().all(|&count| count == 1));
}
