//! Engine configuration (§6).

use std::time::Duration;

use jobstore_core::{IdType, StringComparer};

/// Configuration knobs the façade sets at construction time.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper cap applied to all expiry requests except counters and the
    /// just-created-job window. `Some(Duration::ZERO)` allows the
    /// immediate-deletion path; `None` means uncapped.
    pub max_expiration_time: Option<Duration>,
    /// Ordering/equality for string keys and values (not state-index keys,
    /// which are always case-insensitive).
    pub string_comparer: StringComparer,
    /// Job-key variant minted for new jobs.
    pub id_type: IdType,
    /// Cap on the state history sequence per job.
    pub max_state_history_length: usize,
    /// Upper bound on a dispatcher submission's wait. `None` means infinite.
    pub command_timeout: Option<Duration>,
    /// Interval between automatic eviction sweeps.
    pub eviction_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_expiration_time: Some(Duration::from_secs(3 * 60 * 60)),
            string_comparer: StringComparer::Ordinal,
            id_type: IdType::Counter,
            max_state_history_length: 10,
            command_timeout: None,
            eviction_interval: Duration::from_secs(5),
        }
    }
}

impl EngineConfig {
    /// Applies `max_expiration_time` to a requested expiry duration, per
    /// §4.2 `jobExpire`: `min(expire_in, max_expiration)`, uncapped if the
    /// configured cap is `None`.
    #[must_use]
    pub fn cap_expiry(&self, expire_in: Duration) -> Duration {
        match self.max_expiration_time {
            Some(max) => expire_in.min(max),
            None => expire_in,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cap_expiry_clamps_to_configured_max() {
        let config = EngineConfig {
            max_expiration_time: Some(Duration::from_secs(3600)),
            ..EngineConfig::default()
        };
        assert_eq!(
            config.cap_expiry(Duration::from_secs(86_400)),
            Duration::from_secs(3600)
        );
    }

    #[test]
    fn cap_expiry_uncapped_when_none() {
        let config = EngineConfig {
            max_expiration_time: None,
            ..EngineConfig::default()
        };
        assert_eq!(
            config.cap_expiry(Duration::from_secs(86_400)),
            Duration::from_secs(86_400)
        );
    }
}
