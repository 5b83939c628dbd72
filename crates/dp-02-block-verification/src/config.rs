//! Configuration for block verification

use serde::Deserialize;
use shared_types::{Hash, Transaction, ZERO_HASH};

/// Largest accepted block nonce.
pub const DEFAULT_MAX_NONCE: u32 = 1000;

/// Per-block execution ceiling.
pub const DEFAULT_MAX_BLOCK_RUN_STEPS: u64 = 12_000_000;

/// Largest accepted serialized block.
pub const DEFAULT_MAX_BLOCK_SIZE: u64 = 4_000_000;

/// Largest accepted block signature in bytes.
pub const DEFAULT_MAX_SIGNATURE_SIZE: usize = 100;

/// How far past the local clock a block timestamp may run.
pub const DEFAULT_MAX_FUTURE_SECS: u64 = 60;

/// Verifier parameters
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    pub max_nonce: u32,

    pub max_block_run_steps: u64,

    /// Only transaction version accepted
    pub tx_version: u32,

    pub max_signature_size: usize,

    pub max_block_size: u64,

    /// Only enforced when the verifier has a clock
    pub max_future_secs: u64,

    /// Hash of the genesis block; its first child skips the
    /// double-production check
    pub genesis_hash: Hash,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            max_nonce: DEFAULT_MAX_NONCE,
            max_block_run_steps: DEFAULT_MAX_BLOCK_RUN_STEPS,
            tx_version: Transaction::CURRENT_VERSION,
            max_signature_size: DEFAULT_MAX_SIGNATURE_SIZE,
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
            max_future_secs: DEFAULT_MAX_FUTURE_SECS,
            genesis_hash: ZERO_HASH,
        }
    }
}
