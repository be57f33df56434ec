// Job Store Engine -- single-writer transactional in-memory engine.

pub mod clock;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fetcher;
pub mod lock_registry;
pub mod queries;
pub mod store;
pub mod transaction;
pub mod wait_graph;

pub use clock::{MonotonicClock, SystemClock, VirtualClock};
pub use commands::Command;
pub use config::EngineConfig;
pub use dispatcher::{Dispatcher, DispatcherHandle, ReadMode};
pub use error::{EngineError, Result};
pub use fetcher::{fetch_next, CancellationToken, FetchResult};
pub use lock_registry::{LockGuard, LockRegistry};
pub use store::StateStore;
pub use transaction::Transaction;
pub use wait_graph::{WaitGraph, WaitNode};
