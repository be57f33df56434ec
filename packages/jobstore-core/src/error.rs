//! Domain-level error type (§7): preconditions and programming errors that
//! are detected purely from the data model, independent of the engine's
//! concurrency machinery.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("history cap must allow at least the state being recorded")]
    InvalidHistoryCap,
}

pub type Result<T> = std::result::Result<T, DomainError>;
