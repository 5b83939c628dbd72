//! # In-Memory Ledger
//!
//! Canonical chain and state behind one lock. Commits extend the chain by
//! exactly one block and replay it onto the current snapshot.

use super::snapshot::MemorySnapshot;
use crate::entities::{Account, AccountId, Block, ExecutionContext, FeeToken};
use crate::errors::LedgerError;
use crate::hashing::short_hex;
use crate::ports::{LedgerSnapshot, LedgerStore};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, info};

/// Initial ledger contents.
#[derive(Debug, Clone, Default)]
pub struct GenesisState {
    pub accounts: Vec<Account>,
    /// Delegate vote tally, best first.
    pub delegates: Vec<AccountId>,
    pub prices: HashMap<FeeToken, u64>,
}

struct Chain {
    blocks: Vec<Block>,
    tip: Block,
    state: MemorySnapshot,
}

/// Canonical chain kept in memory.
pub struct MemoryLedger {
    chain: RwLock<Chain>,
}

impl MemoryLedger {
    pub fn new(genesis: Block, state: GenesisState) -> Self {
        let snapshot = MemorySnapshot::new(state.accounts, state.delegates, state.prices);
        Self {
            chain: RwLock::new(Chain {
                blocks: vec![genesis.clone()],
                tip: genesis,
                state: snapshot,
            }),
        }
    }

    pub fn height(&self) -> u64 {
        self.chain.read().tip.height
    }

    /// Genesis block.
    pub fn genesis(&self) -> Block {
        let chain = self.chain.read();
        chain.blocks.first().cloned().unwrap_or_else(|| chain.tip.clone())
    }
}

impl LedgerStore for MemoryLedger {
    type Snapshot = MemorySnapshot;

    fn tip(&self) -> Block {
        self.chain.read().tip.clone()
    }

    fn block_at(&self, height: u64) -> Option<Block> {
        let chain = self.chain.read();
        let base = chain.blocks.first()?.height;
        let offset = usize::try_from(height.checked_sub(base)?).ok()?;
        chain.blocks.get(offset).cloned()
    }

    fn snapshot(&self) -> MemorySnapshot {
        self.chain.read().state.clone()
    }

    fn commit_block(&self, block: &Block) -> Result<(), LedgerError> {
        let mut chain = self.chain.write();

        if block.prev_hash != chain.tip.hash() || block.height != chain.tip.height + 1 {
            return Err(LedgerError::CommitRejected(format!(
                "block {} at height {} does not extend tip {}",
                short_hex(&block.hash()),
                block.height,
                chain.tip.height
            )));
        }

        let mut trial = chain.state.clone();
        for (index, tx) in block.transactions.iter().enumerate() {
            let ctx = ExecutionContext {
                height: block.height,
                index,
                fuel_rate: block.fuel_rate,
            };
            trial.execute(tx, ctx).map_err(|e| {
                LedgerError::CommitRejected(format!("tx {} failed: {}", index, e))
            })?;
        }

        chain.state = trial.flatten();
        chain.tip = block.clone();
        chain.blocks.push(block.clone());

        debug!(
            "[ledger] Committed block {} at height {}",
            short_hex(&block.hash()),
            block.height
        );
        if block.height % 1000 == 0 {
            info!("[ledger] Canonical height {}", block.height);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Transaction, INITIAL_FUEL_RATE, ZERO_HASH};

    fn genesis() -> Block {
        Block {
            version: 1,
            height: 0,
            prev_hash: ZERO_HASH,
            timestamp: 0,
            nonce: 0,
            fuel: 0,
            fuel_rate: INITIAL_FUEL_RATE,
            merkle_root: ZERO_HASH,
            signature: Vec::new(),
            transactions: Vec::new(),
        }
    }

    fn ledger() -> MemoryLedger {
        MemoryLedger::new(
            genesis(),
            GenesisState {
                accounts: vec![Account {
                    id: AccountId::new(0, 1),
                    owner_pubkey: [1; 32],
                    miner_pubkey: None,
                    balance: 0,
                }],
                delegates: vec![AccountId::new(0, 1)],
                prices: HashMap::new(),
            },
        )
    }

    fn child(parent: &Block, reward: u64) -> Block {
        let mut block = Block {
            height: parent.height + 1,
            prev_hash: parent.hash(),
            timestamp: parent.timestamp + 10,
            transactions: vec![Transaction::reward(
                AccountId::new(0, 1),
                parent.height + 1,
                reward,
            )],
            ..genesis()
        };
        block.merkle_root = block.compute_merkle_root();
        block
    }

    #[test]
    fn test_commit_extends_tip_and_credits_reward() {
        let ledger = ledger();
        let block = child(&ledger.tip(), 50);
        ledger.commit_block(&block).unwrap();

        assert_eq!(ledger.height(), 1);
        assert_eq!(ledger.block_at(1), Some(block));
        let producer = ledger.snapshot().account(&AccountId::new(0, 1)).unwrap();
        assert_eq!(producer.balance, 50);
    }

    #[test]
    fn test_commit_rejects_non_extending_block() {
        let ledger = ledger();
        let mut block = child(&ledger.tip(), 0);
        block.prev_hash = [7; 32];
        assert!(matches!(
            ledger.commit_block(&block),
            Err(LedgerError::CommitRejected(_))
        ));
        assert_eq!(ledger.height(), 0);
    }

    #[test]
    fn test_block_at_out_of_range() {
        let ledger = ledger();
        assert!(ledger.block_at(0).is_some());
        assert!(ledger.block_at(1).is_none());
    }
}
