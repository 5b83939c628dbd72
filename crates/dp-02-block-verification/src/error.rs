//! Error types for block verification

use dp_01_delegate_schedule::ScheduleError;
use shared_types::AccountId;
use thiserror::Error;

/// Result type alias for verification
pub type Result<T> = std::result::Result<T, VerificationError>;

/// Reasons a block is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("Height mismatch: expected {expected}, got {actual}")]
    HeightMismatch { expected: u64, actual: u64 },

    #[error("Previous hash does not match predecessor")]
    PrevHashMismatch,

    #[error("Timestamp {timestamp} precedes predecessor timestamp {predecessor}")]
    TimestampBeforePredecessor { timestamp: u64, predecessor: u64 },

    #[error("Timestamp {timestamp} beyond local limit {limit}")]
    TimestampTooFarAhead { timestamp: u64, limit: u64 },

    #[error("Block has no transactions")]
    EmptyBlock,

    #[error("First transaction is not a block reward")]
    MissingReward,

    #[error("Nonce {nonce} exceeds maximum {max}")]
    NonceTooLarge { nonce: u32, max: u32 },

    #[error("Merkle root mismatch")]
    MerkleRootMismatch,

    #[error("Block size {size} exceeds maximum {max}")]
    BlockTooLarge { size: u64, max: u64 },

    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// Same delegate produced the predecessor less than one interval earlier
    #[error("Delegate {producer} produced twice within {elapsed}s (interval {interval}s)")]
    DoubleProduction {
        producer: AccountId,
        elapsed: u64,
        interval: u64,
    },

    #[error("Wrong producer: expected {expected}, got {actual}")]
    WrongProducer {
        expected: AccountId,
        actual: AccountId,
    },

    #[error("Producer account {0} not found")]
    UnknownProducer(AccountId),

    #[error("Signature size {size} outside 1..={max}")]
    InvalidSignatureSize { size: usize, max: usize },

    #[error("Invalid block signature")]
    InvalidSignature,

    #[error("Unsupported version {version} for transaction {index}")]
    UnsupportedTxVersion { index: usize, version: u32 },

    #[error("Reward transaction at index {index}")]
    ExtraReward { index: usize },

    #[error("Transaction {tx_hash} at index {index} already confirmed")]
    DuplicateTransaction { index: usize, tx_hash: String },

    #[error("Transaction {tx_hash} at index {index} failed: {reason}")]
    ExecutionFailed {
        index: usize,
        tx_hash: String,
        reason: String,
    },

    #[error("Run steps {steps} exceed block maximum {max}")]
    RunStepsExceeded { steps: u64, max: u64 },

    #[error("Fuel mismatch: header declares {declared}, replay computed {computed}")]
    FuelMismatch { declared: u64, computed: u64 },

    #[error("Reward mismatch: block pays {declared}, fees allow {computed}")]
    RewardMismatch { declared: u64, computed: u64 },
}

impl VerificationError {
    /// Short label for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::HeightMismatch { .. } | Self::PrevHashMismatch => "linkage",
            Self::TimestampBeforePredecessor { .. } | Self::TimestampTooFarAhead { .. } => {
                "timestamp"
            }
            Self::EmptyBlock | Self::MissingReward | Self::ExtraReward { .. } => "shape",
            Self::NonceTooLarge { .. } => "nonce",
            Self::MerkleRootMismatch => "merkle_root",
            Self::BlockTooLarge { .. } => "size",
            Self::Schedule(_) => "schedule",
            Self::DoubleProduction { .. } => "double_production",
            Self::WrongProducer { .. } | Self::UnknownProducer(_) => "producer",
            Self::InvalidSignatureSize { .. } | Self::InvalidSignature => "signature",
            Self::UnsupportedTxVersion { .. } => "tx_version",
            Self::DuplicateTransaction { .. } => "duplicate_tx",
            Self::ExecutionFailed { .. } => "execution",
            Self::RunStepsExceeded { .. } => "run_steps",
            Self::FuelMismatch { .. } => "fuel",
            Self::RewardMismatch { .. } => "reward",
        }
    }
}
