//! Reference counts of transactions held by pooled blocks.

use shared_types::{Block, Hash};
use std::collections::HashMap;

/// Number of pooled blocks, across every branch, containing each transaction.
///
/// An entry exists exactly while its count is positive.
#[derive(Debug, Default, Clone)]
pub struct PendingIndex {
    counts: HashMap<Hash, usize>,
}

impl PendingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts every transaction of a newly pooled block.
    pub fn add_block(&mut self, block: &Block) {
        for tx_hash in block.tx_hashes() {
            *self.counts.entry(tx_hash).or_insert(0) += 1;
        }
    }

    /// Releases the transactions of a block leaving the pool.
    pub fn remove_block(&mut self, block: &Block) {
        for tx_hash in block.tx_hashes() {
            if let Some(count) = self.counts.get_mut(&tx_hash) {
                *count -= 1;
                if *count == 0 {
                    self.counts.remove(&tx_hash);
                }
            }
        }
    }

    pub fn contains(&self, tx_hash: &Hash) -> bool {
        self.counts.contains_key(tx_hash)
    }

    pub fn count(&self, tx_hash: &Hash) -> usize {
        self.counts.get(tx_hash).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
