//! # Collaborator Ports
//!
//! Narrow interfaces through which the consensus core reaches the ledger,
//! the mempool, the keyring and the clock. The core performs no I/O itself.

use crate::entities::{
    Account, AccountId, Block, ExecutionContext, ExecutionReceipt, FeeToken, Hash, MempoolEntry,
    PublicKey, Transaction,
};
use crate::errors::LedgerError;

/// Source of the active delegate set (vote tally).
pub trait DelegateSource {
    /// Top-voted delegates, best first. May hold more than the active set.
    fn top_delegates(&self) -> Result<Vec<AccountId>, LedgerError>;
}

/// Layered copy-on-write view of ledger state.
///
/// Cloning is cheap; mutations stay local to the clone. Merging a trial
/// clone into its parent means assigning the clone over the parent.
pub trait LedgerSnapshot: DelegateSource + Clone + Send + Sync + 'static {
    /// Whether the transaction is already confirmed in this view.
    fn is_tx_confirmed(&self, tx_hash: &Hash) -> bool;

    fn account(&self, id: &AccountId) -> Option<Account>;

    /// Median price of a fee token, in native units scaled by the price boost.
    fn median_price(&self, token: FeeToken) -> u64;

    /// Executes a transaction, marking it confirmed in this view.
    fn execute(
        &mut self,
        tx: &Transaction,
        ctx: ExecutionContext,
    ) -> Result<ExecutionReceipt, LedgerError>;
}

/// Canonical chain storage.
pub trait LedgerStore: Send + Sync + 'static {
    type Snapshot: LedgerSnapshot;

    /// Canonical tip block.
    fn tip(&self) -> Block;

    /// Canonical block at `height`.
    fn block_at(&self, height: u64) -> Option<Block>;

    /// Fresh snapshot rooted at the canonical tip.
    fn snapshot(&self) -> Self::Snapshot;

    /// Appends a final block to the canonical chain.
    fn commit_block(&self, block: &Block) -> Result<(), LedgerError>;
}

/// Pending transaction pool.
pub trait Mempool: Send + Sync + 'static {
    fn pending(&self) -> Vec<MempoolEntry>;

    /// Offers a transaction; the pool re-validates it before accepting.
    fn offer(&self, tx: Transaction) -> Result<(), LedgerError>;

    fn remove(&self, tx_hash: &Hash);

    /// Bumped on every insertion or removal.
    fn update_counter(&self) -> u64;
}

/// Keyring and signature checker.
pub trait BlockSigner: Send + Sync {
    fn has_key(&self, pubkey: &PublicKey) -> bool;

    fn has_any_key(&self) -> bool;

    /// Signs `hash` with the key for `pubkey`, if held.
    fn sign(&self, pubkey: &PublicKey, hash: &Hash) -> Option<Vec<u8>>;

    fn verify(&self, hash: &Hash, signature: &[u8], pubkey: &PublicKey) -> bool;
}

/// Wall clock in unix seconds.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> u64;
}

/// Peer connectivity as seen by the mining gate.
pub trait NetworkStatus: Send + Sync {
    fn peer_count(&self) -> usize;
}
