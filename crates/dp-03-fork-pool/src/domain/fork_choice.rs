//! # Fork Choice
//!
//! Finds the leaf tips of the pooled block tree and picks the preferred one.
//!
//! ## Resolution
//!
//! Starting from the tracked roots (the canonical tip), every frontier entry
//! with pooled children is replaced by those children. Entries without
//! children are leaves. Expansion stops at a fixed point, or once a frontier
//! block sits more than `safety_distance` above the canonical tip.
//!
//! ## Preference
//!
//! Greatest height wins; equal heights go to the earliest timestamp, then to
//! the smallest hash so the choice is total.

use shared_types::{Block, Hash};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Parent hash to child hashes, over pooled blocks.
pub fn children_index(blocks: &HashMap<Hash, Block>) -> HashMap<Hash, Vec<Hash>> {
    let mut children: HashMap<Hash, Vec<Hash>> = HashMap::new();
    for (hash, block) in blocks {
        children.entry(block.prev_hash).or_default().push(*hash);
    }
    children
}

/// Every pooled block descending from `root`.
pub fn descendants_of(root: &Hash, blocks: &HashMap<Hash, Block>) -> HashSet<Hash> {
    let children = children_index(blocks);
    let mut reached = HashSet::new();
    let mut stack = vec![*root];
    while let Some(hash) = stack.pop() {
        for child in children.get(&hash).into_iter().flatten() {
            if reached.insert(*child) {
                stack.push(*child);
            }
        }
    }
    reached
}

/// Leaf tips reachable from `roots`.
///
/// Roots that are not pooled are taken to sit at `canonical_height`.
pub fn resolve_leaves(
    roots: &[Hash],
    blocks: &HashMap<Hash, Block>,
    canonical_height: u64,
    safety_distance: u64,
) -> Vec<Hash> {
    let children = children_index(blocks);
    let height_of = |hash: &Hash| {
        blocks
            .get(hash)
            .map(|b| b.height)
            .unwrap_or(canonical_height)
    };
    let limit = canonical_height.saturating_add(safety_distance);

    let mut frontier: Vec<Hash> = roots.to_vec();
    let mut rounds: u64 = 0;
    loop {
        let mut next = Vec::with_capacity(frontier.len());
        let mut advanced = false;
        for hash in &frontier {
            match children.get(hash) {
                Some(kids) if !kids.is_empty() => {
                    next.extend_from_slice(kids);
                    advanced = true;
                }
                _ => next.push(*hash),
            }
        }
        frontier = next;

        if !advanced {
            break;
        }
        rounds += 1;
        if rounds > safety_distance || frontier.iter().any(|h| height_of(h) > limit) {
            warn!(
                "[dp-03] Fork resolution stopped after {} rounds at safety distance {}",
                rounds, safety_distance
            );
            break;
        }
    }
    frontier
}

/// Total preference order between two candidate tips.
pub fn compare_tips(a: &Block, b: &Block) -> Ordering {
    a.height
        .cmp(&b.height)
        .then_with(|| b.timestamp.cmp(&a.timestamp))
        .then_with(|| b.hash().cmp(&a.hash()))
}

/// Whether `candidate` should replace `incumbent` as the preferred tip.
pub fn is_better(candidate: &Block, incumbent: &Block) -> bool {
    compare_tips(candidate, incumbent) == Ordering::Greater
}

/// Most preferred pooled block among `leaves`, if any is pooled.
pub fn select_preferred<'a>(
    leaves: &[Hash],
    blocks: &'a HashMap<Hash, Block>,
) -> Option<&'a Block> {
    leaves
        .iter()
        .filter_map(|hash| blocks.get(hash))
        .max_by(|a, b| compare_tips(a, b))
}
