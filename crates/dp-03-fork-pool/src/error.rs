//! Error types for the fork pool

use dp_02_block_verification::VerificationError;
use shared_types::LedgerError;
use thiserror::Error;

/// Result type alias for fork pool operations
pub type Result<T> = std::result::Result<T, ForkPoolError>;

/// Fork pool failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForkPoolError {
    /// No path to the canonical tip; may be retried once the ancestor arrives
    #[error("Orphan block {hash}: unknown ancestor {missing}")]
    Orphan { hash: String, missing: String },

    /// The block, or a block on its branch, failed verification
    #[error("Block {hash} failed verification: {source}")]
    Verification {
        hash: String,
        #[source]
        source: VerificationError,
    },

    /// Committing a final block diverged from the pooled state; the pool was reset
    #[error("Consensus failure at height {height}: {reason}")]
    ConsensusFailure { height: u64, reason: String },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl ForkPoolError {
    pub fn is_orphan(&self) -> bool {
        matches!(self, Self::Orphan { .. })
    }

    /// Short label for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Orphan { .. } => "orphan",
            Self::Verification { .. } => "verification",
            Self::ConsensusFailure { .. } => "consensus_failure",
            Self::Ledger(_) => "ledger",
        }
    }
}
