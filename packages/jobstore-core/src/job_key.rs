//! Job key: a totally-ordered opaque job identifier (§3, §9 "parametrised
//! `TKey`" design note). Two concrete variants are supported; the variant in
//! use is a configuration-time choice (`IdType`), not a generic parameter,
//! since the engine is a concrete crate rather than a generic library.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which `JobKey` variant a store instance mints for new jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdType {
    /// 64-bit monotonically increasing counter. Default.
    #[default]
    Counter,
    /// 128-bit UUID (v4).
    Uuid,
}

/// Totally-ordered job identifier.
///
/// `Counter` and `Uuid` keys never compare equal to each other; ordering
/// between variants is by discriminant (`Counter` sorts before `Uuid`) so a
/// single store never mixes them in practice — `IdType` is fixed at
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum JobKey {
    Counter(u64),
    Uuid(Uuid),
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Counter(n) => write!(f, "{n}"),
            Self::Uuid(u) => write!(f, "{u}"),
        }
    }
}

/// Generates `JobKey`s for a given `IdType`.
///
/// Grounded on `core-rust`'s small-trait-per-concern style: this is a pure
/// generator with no store dependency, so `jobstore-engine` can inject it
/// without coupling the key scheme to the dispatcher.
#[derive(Debug)]
pub struct JobKeyGenerator {
    id_type: IdType,
    next_counter: AtomicU64,
}

impl JobKeyGenerator {
    #[must_use]
    pub const fn new(id_type: IdType) -> Self {
        Self {
            id_type,
            next_counter: AtomicU64::new(1),
        }
    }

    /// Produces the next key for this generator's `IdType`.
    pub fn next(&self) -> JobKey {
        match self.id_type {
            IdType::Counter => JobKey::Counter(self.next_counter.fetch_add(1, Ordering::Relaxed)),
            IdType::Uuid => JobKey::Uuid(Uuid::new_v4()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_generator_produces_increasing_keys() {
        let gen = JobKeyGenerator::new(IdType::Counter);
        let a = gen.next();
        let b = gen.next();
        assert!(a < b);
    }

    #[test]
    fn uuid_generator_produces_distinct_keys() {
        let gen = JobKeyGenerator::new(IdType::Uuid);
        let a = gen.next();
        let b = gen.next();
        assert_ne!(a, b);
    }
}
