//! Error types for block production

use dp_01_delegate_schedule::ScheduleError;
use dp_03_fork_pool::ForkPoolError;
use shared_types::{AccountId, LedgerError};
use thiserror::Error;

/// Result type alias for block production operations
pub type Result<T> = std::result::Result<T, BlockProductionError>;

/// Errors that end a production attempt
#[derive(Debug, Error)]
pub enum BlockProductionError {
    /// No connected peers and solo mining is off
    #[error("No connected peers")]
    NoPeers,

    /// The keyring holds no key at all
    #[error("No signing key available")]
    NoSigningKey,

    /// The preferred tip is too old to build on
    #[error("Preferred tip is stale: {age_secs}s old")]
    StaleTip { age_secs: u64 },

    /// The preferred tip moved while the candidate was pending
    #[error("Preferred tip changed during the attempt")]
    TipChanged,

    /// The mempool changed while the candidate was pending
    #[error("Mempool changed during the attempt")]
    StaleMempool,

    /// The attempt ran out of time
    #[error("Mining attempt timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The slot belongs to a delegate whose key this node does not hold
    #[error("Slot belongs to {delegate}, whose key is not held")]
    NotScheduled { delegate: AccountId },

    /// The delegate would produce twice within one interval
    #[error("Delegate {producer} already produced the previous block within the interval")]
    DoubleProduction { producer: AccountId },

    /// The scheduled delegate has no account in the ledger view
    #[error("Scheduled delegate {0} has no account")]
    UnknownDelegate(AccountId),

    #[error("Signing failed for delegate {0}")]
    SigningFailed(AccountId),

    /// The fork pool refused the produced block
    #[error("Produced block rejected: {0}")]
    Rejected(#[from] ForkPoolError),

    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl BlockProductionError {
    /// Error ends only the current attempt; the loop should retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::NoPeers
                | Self::StaleTip { .. }
                | Self::TipChanged
                | Self::StaleMempool
                | Self::Timeout { .. }
                | Self::NotScheduled { .. }
                | Self::DoubleProduction { .. }
        )
    }

    /// Error should stop production altogether.
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::NoSigningKey | Self::InvalidConfig(_))
    }

    /// Short label for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NoPeers => "no_peers",
            Self::NoSigningKey => "no_signing_key",
            Self::StaleTip { .. } => "stale_tip",
            Self::TipChanged => "tip_changed",
            Self::StaleMempool => "stale_mempool",
            Self::Timeout { .. } => "timeout",
            Self::NotScheduled { .. } => "not_scheduled",
            Self::DoubleProduction { .. } => "double_production",
            Self::UnknownDelegate(_) => "unknown_delegate",
            Self::SigningFailed(_) => "signing_failed",
            Self::Rejected(_) => "rejected",
            Self::Schedule(_) => "schedule",
            Self::Ledger(_) => "ledger",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }
}
