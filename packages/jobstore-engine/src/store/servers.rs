//! Server container (§3, §4.8): registered worker processes, indexed by
//! server id, with announce/heartbeat/delete/reap-inactive operations.

use std::collections::BTreeMap;

use jobstore_core::{MonotonicTime, ServerContext, ServerEntry};

#[derive(Debug, Default)]
pub struct ServersContainer {
    servers: BTreeMap<String, ServerEntry>,
}

impl ServersContainer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn announce(&mut self, id: impl Into<String>, context: ServerContext, now: MonotonicTime) {
        let id = id.into();
        self.servers.insert(id.clone(), ServerEntry::new(id, context, now));
    }

    pub fn heartbeat(&mut self, id: &str, now: MonotonicTime) {
        if let Some(server) = self.servers.get_mut(id) {
            server.heartbeat_at = now;
        }
    }

    pub fn delete(&mut self, id: &str) -> Option<ServerEntry> {
        self.servers.remove(id)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ServerEntry> {
        self.servers.get(id)
    }

    #[must_use]
    pub fn all(&self) -> Vec<ServerEntry> {
        self.servers.values().cloned().collect()
    }

    /// Removes every server whose heartbeat is older than `timeout`
    /// relative to `now`. Returns the removed server ids.
    pub fn delete_inactive(&mut self, now: MonotonicTime, timeout: std::time::Duration) -> Vec<String> {
        let stale: Vec<String> = self
            .servers
            .iter()
            .filter(|(_, server)| now.duration_since(server.heartbeat_at) > timeout)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &stale {
            self.servers.remove(id);
        }
        stale
    }
}
