//! Fork pool state guarded by the pool lock.

use crate::domain::{descendants_of, PendingIndex};
use shared_types::{Block, Hash};
use std::collections::HashMap;
use std::sync::Arc;

/// Pooled blocks, their transaction counts and the preferred tip.
///
/// The snapshot is the ledger view after `tip`. Adopting a new tip swaps the
/// `Arc`; a snapshot already handed out is never mutated.
pub struct PoolState<S> {
    pub blocks: HashMap<Hash, Block>,
    pub pending: PendingIndex,
    pub tip: Block,
    pub snapshot: Arc<S>,
}

impl<S> PoolState<S> {
    /// Empty pool whose tip is the canonical tip.
    pub fn rooted_at(canonical_tip: Block, snapshot: S) -> Self {
        Self {
            blocks: HashMap::new(),
            pending: PendingIndex::new(),
            tip: canonical_tip,
            snapshot: Arc::new(snapshot),
        }
    }

    /// Pools a verified block and counts its transactions.
    pub fn insert(&mut self, block: Block) {
        self.pending.add_block(&block);
        self.blocks.insert(block.hash(), block);
    }

    /// Drops a block and releases its transactions.
    pub fn remove(&mut self, hash: &Hash) -> Option<Block> {
        let block = self.blocks.remove(hash)?;
        self.pending.remove_block(&block);
        Some(block)
    }

    /// Drops every block at or below `height`, returning how many left.
    pub fn remove_under_height(&mut self, height: u64) -> usize {
        let doomed: Vec<Hash> = self
            .blocks
            .iter()
            .filter(|(_, b)| b.height <= height)
            .map(|(h, _)| *h)
            .collect();
        for hash in &doomed {
            self.remove(hash);
        }
        doomed.len()
    }

    /// Drops every block that does not descend from `root`, returning how
    /// many left.
    pub fn retain_descendants_of(&mut self, root: &Hash) -> usize {
        let keep = descendants_of(root, &self.blocks);
        let stranded: Vec<Hash> = self
            .blocks
            .keys()
            .filter(|h| !keep.contains(*h))
            .copied()
            .collect();
        for hash in &stranded {
            self.remove(hash);
        }
        stranded.len()
    }

    /// Pooled blocks sorted by height, then hash.
    pub fn blocks_by_height(&self) -> Vec<&Block> {
        let mut blocks: Vec<&Block> = self.blocks.values().collect();
        blocks.sort_by_cached_key(|b| (b.height, b.hash()));
        blocks
    }
}
