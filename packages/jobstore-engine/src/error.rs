//! Engine-level error type (§7).

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("invalid argument: {0}")]
    Precondition(String),

    #[error("lock acquisition timed out: {0}")]
    LockTimeout(String),

    #[error("dispatcher submission timed out after {0:?}")]
    DispatcherTimeout(std::time::Duration),

    #[error("dispatcher is corrupted: a command raised {0} and the store is no longer safe")]
    DispatcherCorrupted(String),

    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, EngineError>;
