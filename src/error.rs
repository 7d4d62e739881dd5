//! Error type shared by every module.

use thiserror::Error;

/// Errors raised while building an instance or starting a run.
///
/// All of these are construction-time failures. Once a run has passed
/// initialization it always completes.
#[derive(Error, Debug)]
pub enum BalanceError {
    #[error("job set is empty")]
    EmptyJobSet,

    #[error("invalid processor count: {0} (need at least 1)")]
    InvalidProcessorCount(usize),

    #[error("duplicate job id: {0}")]
    DuplicateJobId(u64),

    #[error("partition invariant violated: {reason}")]
    PartitionInvariantViolation { reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid instance: {0}")]
    InvalidInstance(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BalanceError>;
