//! Block assembly and sealing.

use super::selection::PackedTransactions;
use crate::error::{BlockProductionError, Result};
use shared_types::{
    Account, AccountId, Block, BlockSigner, Hash, PublicKey, Transaction, ZERO_HASH,
};

/// A packed block waiting for its slot.
///
/// The reward transaction carries a placeholder signer and the header has no
/// timestamp, nonce or signature until [`seal`] runs.
#[derive(Debug, Clone)]
pub struct BlockCandidate {
    pub block: Block,
    pub predecessor: Block,
    pub total_fees: u64,
    pub block_size: u64,
    /// Mempool update counter when the candidate was built
    pub mempool_counter: u64,
}

impl BlockCandidate {
    /// Block on `predecessor` holding only a reward transaction.
    pub fn skeleton(predecessor: &Block, fuel_rate: u64) -> Block {
        let height = predecessor.height + 1;
        Block {
            version: Block::CURRENT_VERSION,
            height,
            prev_hash: predecessor.hash(),
            timestamp: 0,
            nonce: 0,
            fuel: 0,
            fuel_rate,
            merkle_root: ZERO_HASH,
            signature: Vec::new(),
            transactions: vec![Transaction::reward(AccountId::default(), height, 0)],
        }
    }

    pub fn assemble<S>(
        predecessor: Block,
        fuel_rate: u64,
        packed: PackedTransactions<S>,
        mempool_counter: u64,
    ) -> Self {
        let mut block = Self::skeleton(&predecessor, fuel_rate);
        block.fuel = packed.total_fuel;
        block.transactions[0].amount = packed.reward;
        block.transactions.extend(packed.transactions);
        Self {
            block,
            predecessor,
            total_fees: packed.total_fees,
            block_size: packed.block_size,
            mempool_counter,
        }
    }

    pub fn height(&self) -> u64 {
        self.block.height
    }

    pub fn prev_hash(&self) -> Hash {
        self.block.prev_hash
    }

    /// Packed transactions, reward included.
    pub fn tx_count(&self) -> usize {
        self.block.transactions.len()
    }
}

/// Slot-specific inputs to [`seal`].
#[derive(Debug, Clone, Copy)]
pub struct SealParams<'a> {
    pub producer: &'a Account,
    pub timestamp: u64,
    pub nonce: u32,
    /// Block interval at the candidate's height
    pub interval: u64,
    pub genesis_hash: Hash,
}

/// Key this node signs with for `account`: the miner key when held,
/// otherwise the owner key.
pub fn signing_key(account: &Account, signer: &dyn BlockSigner) -> Option<PublicKey> {
    account
        .miner_pubkey
        .iter()
        .chain(std::iter::once(&account.owner_pubkey))
        .find(|key| signer.has_key(key))
        .copied()
}

/// Stamps the candidate for the producer's slot and signs it.
pub fn seal(
    candidate: &BlockCandidate,
    params: SealParams<'_>,
    signer: &dyn BlockSigner,
) -> Result<Block> {
    let producer = params.producer.id;
    let predecessor = &candidate.predecessor;
    let first_block = candidate.height() == 1 && candidate.prev_hash() == params.genesis_hash;
    if !first_block
        && params.timestamp.saturating_sub(predecessor.timestamp) < params.interval
        && predecessor.producer() == Some(producer)
    {
        return Err(BlockProductionError::DoubleProduction { producer });
    }

    let key = signing_key(params.producer, signer)
        .ok_or(BlockProductionError::NotScheduled { delegate: producer })?;

    let mut block = candidate.block.clone();
    block.transactions[0].signer = producer;
    block.transactions[0].valid_height = block.height;
    block.nonce = params.nonce;
    block.merkle_root = block.compute_merkle_root();
    block.timestamp = params.timestamp;
    block.signature = signer
        .sign(&key, &block.signature_hash())
        .ok_or(BlockProductionError::SigningFailed(producer))?;
    Ok(block)
}
