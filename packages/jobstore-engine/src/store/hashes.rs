//! Hash container (§3): field-name -> string, created on first write,
//! destroyed when empty.

use std::collections::BTreeMap;
use std::time::Duration;

use jobstore_core::MonotonicTime;

use super::expiry::ExpirableMap;

#[derive(Debug, Default)]
pub struct HashesContainer {
    hashes: ExpirableMap<BTreeMap<String, String>>,
}

impl HashesContainer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BTreeMap<String, String>> {
        self.hashes.get(name)
    }

    /// `hashSetRange`: sets all given fields, creating the hash if absent.
    pub fn set_range(&mut self, name: &str, fields: Vec<(String, String)>) {
        let map = self.hashes.get_or_add(name, BTreeMap::new);
        for (field, value) in fields {
            map.insert(field, value);
        }
    }

    /// Removes the entire hash.
    pub fn remove(&mut self, name: &str) {
        self.hashes.remove(name);
    }

    pub fn expire(
        &mut self,
        name: &str,
        now: Option<MonotonicTime>,
        expire_in: Option<Duration>,
        cap: impl Fn(Duration) -> Duration,
    ) {
        self.hashes.expire(name, now, expire_in, cap);
    }

    pub fn evict_expired(&mut self, now: MonotonicTime) -> Vec<String> {
        self.hashes.evict_expired(now)
    }
}
