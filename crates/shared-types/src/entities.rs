//! # Core Domain Entities
//!
//! Blocks, transactions and delegate accounts of the DPoS chain.
//!
//! ## Clusters
//!
//! - **Chain**: `Block`, `Transaction`, `TxKind`
//! - **Accounts**: `AccountId`, `Account`
//! - **Execution**: `ExecutionContext`, `ExecutionReceipt`, fuel helpers
//! - **Mempool**: `MempoolEntry`

use crate::hashing::merkle_root;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

// =============================================================================
// PRIMITIVES
// =============================================================================

/// A 32-byte SHA-256 hash.
pub type Hash = [u8; 32];

/// A 32-byte Ed25519 public key.
pub type PublicKey = [u8; 32];

/// The all-zero hash.
pub const ZERO_HASH: Hash = [0u8; 32];

/// Run steps covered by one unit of fuel.
pub const STEPS_PER_FUEL_UNIT: u64 = 100;

/// Fuel rate used until enough history exists to adjust it.
pub const INITIAL_FUEL_RATE: u64 = 100;

/// Fuel charged for `run_steps` at `fuel_rate`.
///
/// Steps are billed in whole units of [`STEPS_PER_FUEL_UNIT`], rounding up.
pub fn fuel(run_steps: u64, fuel_rate: u64) -> u64 {
    run_steps
        .div_ceil(STEPS_PER_FUEL_UNIT)
        .saturating_mul(fuel_rate)
}

// =============================================================================
// ACCOUNTS
// =============================================================================

/// Registration id of an account: the height and index of the transaction
/// that registered it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct AccountId {
    pub height: u32,
    pub index: u16,
}

impl AccountId {
    pub const fn new(height: u32, index: u16) -> Self {
        Self { height, index }
    }

    fn write_to(&self, hasher: &mut Sha256) {
        hasher.update(self.height.to_le_bytes());
        hasher.update(self.index.to_le_bytes());
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.height, self.index)
    }
}

/// Ledger account as seen by block verification and production.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Key that owns the account.
    pub owner_pubkey: PublicKey,
    /// Optional hot key a delegate may designate for block signing.
    pub miner_pubkey: Option<PublicKey>,
    pub balance: u64,
}

impl Account {
    /// Keys accepted for a block signature, owner key first.
    pub fn signing_keys(&self) -> impl Iterator<Item = &PublicKey> {
        std::iter::once(&self.owner_pubkey).chain(self.miner_pubkey.iter())
    }
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// Transaction categories the core distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxKind {
    /// Pays the producing delegate; always the first transaction of a block.
    BlockReward,
    Transfer,
    ContractDeploy,
    ContractCall,
    DelegateVote,
}

impl TxKind {
    pub fn is_reward(self) -> bool {
        matches!(self, TxKind::BlockReward)
    }

    pub fn is_contract(self) -> bool {
        matches!(self, TxKind::ContractDeploy | TxKind::ContractCall)
    }

    fn tag(self) -> u8 {
        match self {
            TxKind::BlockReward => 1,
            TxKind::Transfer => 3,
            TxKind::ContractDeploy => 4,
            TxKind::ContractCall => 5,
            TxKind::DelegateVote => 6,
        }
    }
}

/// Token a transaction pays its fees in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FeeToken {
    #[default]
    Native,
    Stable,
}

/// A signed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub kind: TxKind,
    pub version: u32,
    /// Sender; for a reward transaction, the producing delegate.
    pub signer: AccountId,
    pub recipient: Option<AccountId>,
    pub amount: u64,
    /// Height at which the sender built the transaction.
    pub valid_height: u64,
    pub fee_token: FeeToken,
    pub fees: u64,
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
}

impl Transaction {
    /// Current transaction format version.
    pub const CURRENT_VERSION: u32 = 1;

    /// Builds the reward transaction that heads a block.
    pub fn reward(producer: AccountId, height: u64, amount: u64) -> Self {
        Self {
            kind: TxKind::BlockReward,
            version: Self::CURRENT_VERSION,
            signer: producer,
            recipient: None,
            amount,
            valid_height: height,
            fee_token: FeeToken::Native,
            fees: 0,
            payload: Vec::new(),
            signature: Vec::new(),
        }
    }

    /// Content hash, signature included.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update([self.kind.tag()]);
        hasher.update(self.version.to_le_bytes());
        self.signer.write_to(&mut hasher);
        match &self.recipient {
            Some(recipient) => {
                hasher.update([1u8]);
                recipient.write_to(&mut hasher);
            }
            None => hasher.update([0u8]),
        }
        hasher.update(self.amount.to_le_bytes());
        hasher.update(self.valid_height.to_le_bytes());
        hasher.update([self.fee_token as u8]);
        hasher.update(self.fees.to_le_bytes());
        hasher.update((self.payload.len() as u64).to_le_bytes());
        hasher.update(&self.payload);
        hasher.update((self.signature.len() as u64).to_le_bytes());
        hasher.update(&self.signature);
        hasher.finalize().into()
    }

    /// Encoded size in bytes.
    pub fn serialized_size(&self) -> u64 {
        bincode::serialized_size(self).unwrap_or(u64::MAX)
    }

    pub fn is_reward(&self) -> bool {
        self.kind.is_reward()
    }
}

// =============================================================================
// BLOCKS
// =============================================================================

/// A block. Immutable once sealed; its hash is a pure function of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub version: u32,
    pub height: u64,
    pub prev_hash: Hash,
    /// Unix seconds.
    pub timestamp: u64,
    pub nonce: u32,
    /// Total fuel consumed by the block's transactions.
    pub fuel: u64,
    pub fuel_rate: u64,
    pub merkle_root: Hash,
    pub signature: Vec<u8>,
    /// First entry is the reward transaction naming the producer.
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub const CURRENT_VERSION: u32 = 1;

    /// Hash the producer signs: every header field except the signature.
    pub fn signature_hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.version.to_le_bytes());
        hasher.update(self.height.to_le_bytes());
        hasher.update(self.prev_hash);
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update(self.nonce.to_le_bytes());
        hasher.update(self.fuel.to_le_bytes());
        hasher.update(self.fuel_rate.to_le_bytes());
        hasher.update(self.merkle_root);
        hasher.finalize().into()
    }

    /// Block identity.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.signature_hash());
        hasher.update((self.signature.len() as u64).to_le_bytes());
        hasher.update(&self.signature);
        hasher.finalize().into()
    }

    /// Merkle root recomputed from the transaction list.
    pub fn compute_merkle_root(&self) -> Hash {
        let leaves: Vec<Hash> = self.transactions.iter().map(Transaction::hash).collect();
        merkle_root(&leaves)
    }

    /// Producing delegate, taken from the reward transaction.
    pub fn producer(&self) -> Option<AccountId> {
        self.transactions.first().map(|tx| tx.signer)
    }

    /// Encoded size in bytes.
    pub fn serialized_size(&self) -> u64 {
        bincode::serialized_size(self).unwrap_or(u64::MAX)
    }

    /// Hashes of every transaction in the block.
    pub fn tx_hashes(&self) -> impl Iterator<Item = Hash> + '_ {
        self.transactions.iter().map(Transaction::hash)
    }
}

// =============================================================================
// EXECUTION
// =============================================================================

/// Where a transaction executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionContext {
    pub height: u64,
    /// Position inside the block; 0 is the reward slot.
    pub index: usize,
    pub fuel_rate: u64,
}

/// Outcome of a successful execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutionReceipt {
    pub run_steps: u64,
}

// =============================================================================
// MEMPOOL
// =============================================================================

/// A pending transaction with the metadata block packing needs.
#[derive(Debug, Clone)]
pub struct MempoolEntry {
    pub tx: Transaction,
    /// Serialized size in bytes.
    pub size: u64,
    /// Age/size priority assigned by the mempool.
    pub priority: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(amount: u64) -> Transaction {
        Transaction {
            kind: TxKind::Transfer,
            version: Transaction::CURRENT_VERSION,
            signer: AccountId::new(1, 1),
            recipient: Some(AccountId::new(1, 2)),
            amount,
            valid_height: 1,
            fee_token: FeeToken::Native,
            fees: 10_000,
            payload: Vec::new(),
            signature: vec![7; 64],
        }
    }

    fn block() -> Block {
        let reward = Transaction::reward(AccountId::new(0, 1), 2, 0);
        let mut block = Block {
            version: Block::CURRENT_VERSION,
            height: 2,
            prev_hash: [1; 32],
            timestamp: 1_000,
            nonce: 3,
            fuel: 0,
            fuel_rate: INITIAL_FUEL_RATE,
            merkle_root: ZERO_HASH,
            signature: vec![9; 64],
            transactions: vec![reward, transfer(5)],
        };
        block.merkle_root = block.compute_merkle_root();
        block
    }

    #[test]
    fn test_fuel_rounds_up_to_whole_units() {
        assert_eq!(fuel(0, 100), 0);
        assert_eq!(fuel(1, 100), 100);
        assert_eq!(fuel(100, 100), 100);
        assert_eq!(fuel(101, 7), 14);
    }

    #[test]
    fn test_tx_hash_changes_with_contents() {
        assert_ne!(transfer(1).hash(), transfer(2).hash());
        assert_eq!(transfer(1).hash(), transfer(1).hash());
    }

    #[test]
    fn test_block_hash_covers_signature() {
        let a = block();
        let mut b = a.clone();
        b.signature = vec![8; 64];
        assert_eq!(a.signature_hash(), b.signature_hash());
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_block_producer_is_reward_signer() {
        assert_eq!(block().producer(), Some(AccountId::new(0, 1)));
    }

    #[test]
    fn test_merkle_root_tracks_transactions() {
        let mut b = block();
        let before = b.compute_merkle_root();
        b.transactions.pop();
        assert_ne!(before, b.compute_merkle_root());
    }

    #[test]
    fn test_account_id_display() {
        assert_eq!(AccountId::new(12, 3).to_string(), "12-3");
    }

    #[test]
    fn test_signing_keys_owner_first() {
        let account = Account {
            id: AccountId::new(0, 1),
            owner_pubkey: [1; 32],
            miner_pubkey: Some([2; 32]),
            balance: 0,
        };
        let keys: Vec<_> = account.signing_keys().collect();
        assert_eq!(keys, vec![&[1u8; 32], &[2u8; 32]]);
    }
}
