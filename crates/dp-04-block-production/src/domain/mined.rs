//! Bounded history of blocks this node produced.

use shared_types::{Block, Hash};
use std::collections::VecDeque;

/// Summary of one produced block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinedBlockInfo {
    pub time: u64,
    pub nonce: u32,
    pub height: u64,
    pub fuel: u64,
    pub fuel_rate: u64,
    pub total_fees: u64,
    pub tx_count: usize,
    pub block_size: u64,
    pub hash: Hash,
    pub prev_hash: Hash,
}

impl MinedBlockInfo {
    pub fn new(block: &Block, total_fees: u64, block_size: u64) -> Self {
        Self {
            time: block.timestamp,
            nonce: block.nonce,
            height: block.height,
            fuel: block.fuel,
            fuel_rate: block.fuel_rate,
            total_fees,
            tx_count: block.transactions.len(),
            block_size,
            hash: block.hash(),
            prev_hash: block.prev_hash,
        }
    }
}

/// Ring of the most recent [`MinedBlockInfo`], newest first.
#[derive(Debug)]
pub struct MinedHistory {
    capacity: usize,
    entries: VecDeque<MinedBlockInfo>,
}

impl MinedHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn record(&mut self, info: MinedBlockInfo) {
        self.entries.push_front(info);
        self.entries.truncate(self.capacity);
    }

    /// Up to `count` entries, newest first.
    pub fn latest(&self, count: usize) -> Vec<MinedBlockInfo> {
        self.entries.iter().take(count).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
