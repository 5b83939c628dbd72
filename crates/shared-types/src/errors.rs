//! # Error Types
//!
//! Errors raised by the ledger collaborators (store, snapshot, mempool).

use crate::entities::AccountId;
use thiserror::Error;

/// Errors from the ledger store, a ledger snapshot or the mempool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Referenced account does not exist.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Sender cannot cover amount plus fees.
    #[error("Insufficient balance for {account}: need {needed}, have {available}")]
    InsufficientBalance {
        account: AccountId,
        needed: u64,
        available: u64,
    },

    /// Declared fees do not cover the fuel the execution consumed.
    #[error("Insufficient fee: fuel {fuel} exceeds fees {fees}")]
    InsufficientFee { fees: u64, fuel: u64 },

    /// Transaction is already confirmed in this view.
    #[error("Duplicate transaction: {0}")]
    DuplicateTransaction(String),

    /// Execution failed for another reason.
    #[error("Execution failed: {0}")]
    Execution(String),

    /// Fewer registered delegates than the schedule needs.
    #[error("Delegates unavailable: need {needed}, have {available}")]
    DelegatesUnavailable { needed: usize, available: usize },

    /// No canonical block at the requested height.
    #[error("Block not found at height {0}")]
    BlockNotFound(u64),

    /// The store refused a block handed to it for commit.
    #[error("Commit rejected: {0}")]
    CommitRejected(String),

    /// Transaction is malformed.
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
}
