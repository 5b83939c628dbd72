//! Error types for the delegate schedule

use shared_types::LedgerError;
use thiserror::Error;

/// Result type alias for schedule operations
pub type Result<T> = std::result::Result<T, ScheduleError>;

/// Errors raised while resolving the expected producer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// The vote tally holds fewer delegates than the active set size
    #[error("Not enough delegates: need {needed}, found {available}")]
    NotEnoughDelegates { needed: usize, available: usize },

    /// The delegate source failed
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Slot length of zero at the given height
    #[error("Block interval is zero at height {0}")]
    ZeroInterval(u64),

    /// Active set size of zero
    #[error("Active delegate set size must be positive")]
    EmptyDelegateSet,
}
