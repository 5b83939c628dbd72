//! # Block Verification Subsystem (dp-02)
//!
//! Decides whether a block may join a branch. Used for blocks received from
//! the network and for the node's own candidates before submission, so both
//! paths accept exactly the same blocks.
//!
//! ## Checks (in order)
//!
//! | Check | Rejects when |
//! |-------|--------------|
//! | Linkage | height or prev hash does not follow the predecessor |
//! | Shape | no transactions, or the first is not a reward |
//! | Nonce | nonce above the configured maximum |
//! | Merkle root | recomputed root differs from the header |
//! | Size | serialized size above the block size ceiling |
//! | Double production | scheduled producer also made the predecessor less than one interval earlier |
//! | Producer | reward signer is not the scheduled producer |
//! | Signature | missing, oversized or not from the owner or miner key |
//! | Versions | a transaction carries an unsupported version |
//! | Replay | duplicate, failed execution, step ceiling, fuel or reward mismatch |

pub mod config;
pub mod error;
pub mod metrics;
pub mod verifier;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::VerifierConfig;
pub use error::{Result, VerificationError};
pub use verifier::{BlockReceipt, BlockVerifier};
