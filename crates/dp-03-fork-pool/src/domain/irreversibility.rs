//! # Irreversibility
//!
//! Walks the preferred branch from its tip toward the canonical tip, counting
//! distinct producers. Once `threshold` distinct producers have built on top
//! of a block, that block and everything older on the branch is final.

use shared_types::{Block, Hash};
use std::collections::{HashMap, HashSet};

/// Newly irreversible blocks on the branch ending at `tip`, oldest first.
///
/// The walk stops at `canonical_hash`, which is never itself a candidate.
/// Returns an empty list when fewer than `threshold` producers are seen.
pub fn determine_irreversible(
    tip: &Block,
    blocks: &HashMap<Hash, Block>,
    canonical_hash: &Hash,
    threshold: usize,
) -> Vec<Block> {
    let mut producers = HashSet::new();
    let mut finals = Vec::new();

    let mut cursor = blocks.get(&tip.hash());
    while let Some(block) = cursor {
        if producers.len() >= threshold {
            finals.push(block.clone());
        } else if let Some(producer) = block.producer() {
            producers.insert(producer);
        }

        if block.prev_hash == *canonical_hash {
            break;
        }
        cursor = blocks.get(&block.prev_hash);
    }

    finals.reverse();
    finals
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{AccountId, Transaction, ZERO_HASH};

    const CANONICAL: Hash = [1; 32];

    /// Chain of pooled blocks on top of the canonical tip, one per producer.
    fn chain(producers: &[u16]) -> (Vec<Block>, HashMap<Hash, Block>) {
        let mut parent = CANONICAL;
        let mut out = Vec::new();
        for (i, p) in producers.iter().enumerate() {
            let height = 101 + i as u64;
            let block = Block {
                version: 1,
                height,
                prev_hash: parent,
                timestamp: height * 10,
                nonce: 0,
                fuel: 0,
                fuel_rate: 100,
                merkle_root: ZERO_HASH,
                signature: Vec::new(),
                transactions: vec![Transaction::reward(AccountId::new(0, *p), height, 0)],
            };
            parent = block.hash();
            out.push(block);
        }
        let map = out.iter().map(|b| (b.hash(), b.clone())).collect();
        (out, map)
    }

    #[test]
    fn test_blocks_below_kth_producer_final() {
        let (chain, pool) = chain(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        let tip = chain.last().unwrap();

        let finals = determine_irreversible(tip, &pool, &CANONICAL, 8);

        assert_eq!(finals, chain[..2].to_vec());
    }

    #[test]
    fn test_exactly_k_blocks_nothing_final() {
        let (chain, pool) = chain(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let finals = determine_irreversible(chain.last().unwrap(), &pool, &CANONICAL, 8);
        assert!(finals.is_empty());
    }

    #[test]
    fn test_single_producer_never_final() {
        let (chain, pool) = chain(&[4; 40]);
        let finals = determine_irreversible(chain.last().unwrap(), &pool, &CANONICAL, 8);
        assert!(finals.is_empty());
    }

    #[test]
    fn test_repeat_producers_extend_window() {
        // Producers from tip: 3,2,1,1,2 -> third distinct at index 2 from tip.
        let (chain, pool) = chain(&[2, 1, 1, 2, 3]);
        let finals = determine_irreversible(chain.last().unwrap(), &pool, &CANONICAL, 3);
        assert_eq!(finals, chain[..2].to_vec());
    }

    #[test]
    fn test_final_set_grows_monotonically() {
        let producers: Vec<u16> = (1..=14).collect();
        let (chain, pool) = chain(&producers);

        let earlier = determine_irreversible(&chain[9], &pool, &CANONICAL, 8);
        let later = determine_irreversible(&chain[13], &pool, &CANONICAL, 8);

        assert!(later.starts_with(&earlier));
        assert!(later.len() > earlier.len());
    }

    #[test]
    fn test_bootstrap_threshold_one() {
        let (chain, pool) = chain(&[1, 1, 1]);
        let finals = determine_irreversible(chain.last().unwrap(), &pool, &CANONICAL, 1);
        assert_eq!(finals, chain[..2].to_vec());
    }

    #[test]
    fn test_unpooled_tip_yields_nothing() {
        let (chain, _) = chain(&[1, 2, 3]);
        let finals = determine_irreversible(&chain[2], &HashMap::new(), &CANONICAL, 1);
        assert!(finals.is_empty());
    }
}
