//! Fork Pool Service - branch admission, tip selection and finalization
//!
//! # Architecture
//! - Pooled blocks, pending counts and the preferred tip live in one
//!   `PoolState` behind a non-reentrant lock.
//! - Public operations lock once; `*_locked` helpers take the already locked
//!   state so no operation ever re-acquires the lock.
//! - Branches are replayed through the block verifier on a fresh snapshot
//!   rooted at the canonical tip before anything is inserted.

use crate::config::ForkPoolConfig;
use crate::domain::{determine_irreversible, is_better, resolve_leaves, select_preferred};
use crate::error::{ForkPoolError, Result};
use crate::metrics;
use crate::state::PoolState;
use dp_02_block_verification::BlockVerifier;
use parking_lot::Mutex;
use shared_types::{short_hex, Block, Hash, LedgerError, LedgerSnapshot, LedgerStore, Mempool};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};


/// What happened to a block handed to [`ForkPool::add_block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Verified, pooled and now the preferred tip
    Adopted,
    /// Verified and pooled on a branch that is not preferred
    Pooled,
    /// Already pooled or already canonical
    Duplicate,
}

/// Transactions handled while resetting after a consensus failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResubmitReport {
    /// Accepted back into the mempool, or still there
    pub resubmitted: usize,
    /// Already on the canonical chain
    pub already_confirmed: usize,
    /// Reward transactions, dropped
    pub discarded_rewards: usize,
    /// Refused by the mempool and removed from it
    pub rejected: usize,
}

/// Dependencies for ForkPool
pub struct ForkPoolDependencies<L, M> {
    pub ledger: Arc<L>,
    pub mempool: Arc<M>,
    pub verifier: Arc<BlockVerifier>,
    pub config: ForkPoolConfig,
}

/// Fork pool over a ledger store and mempool.
pub struct ForkPool<L: LedgerStore, M: Mempool> {
    ledger: Arc<L>,
    mempool: Arc<M>,
    verifier: Arc<BlockVerifier>,
    config: ForkPoolConfig,
    state: Mutex<Option<PoolState<L::Snapshot>>>,
}

type Slot<S> = Option<PoolState<S>>;

impl<L: LedgerStore, M: Mempool> ForkPool<L, M> {
    pub fn new(deps: ForkPoolDependencies<L, M>) -> Self {
        Self {
            ledger: deps.ledger,
            mempool: deps.mempool,
            verifier: deps.verifier,
            config: deps.config,
            state: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ForkPoolConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub fn verifier(&self) -> &Arc<BlockVerifier> {
        &self.verifier
    }

    // === BLOCK ADMISSION ===

    /// Verifies `block` together with its pooled ancestry and pools it.
    ///
    /// Fails with [`ForkPoolError::Orphan`] when the ancestry does not reach
    /// the canonical tip, and with [`ForkPoolError::Verification`] when any
    /// block of the branch is rejected; nothing is inserted in either case.
    #[instrument(skip_all, fields(height = block.height))]
    pub fn add_block(&self, block: Block) -> Result<AddOutcome> {
        let hash = block.hash();
        let mut slot = self.state.lock();
        let state = self.init_state(&mut slot);

        let canonical = self.ledger.tip();
        let canonical_hash = canonical.hash();
        if hash == canonical_hash || state.blocks.contains_key(&hash) {
            metrics::record_add("duplicate");
            return Ok(AddOutcome::Duplicate);
        }

        let tip_hash = state.tip.hash();
        let extends_tip = block.prev_hash == tip_hash
            && (tip_hash == canonical_hash || state.blocks.contains_key(&tip_hash));

        let verified = if extends_tip {
            let mut snapshot = (*state.snapshot).clone();
            self.verifier
                .verify_block(&block, &state.tip, &mut snapshot)
                .map(|_| snapshot)
                .map_err(|source| ForkPoolError::Verification {
                    hash: short_hex(&hash),
                    source,
                })
        } else {
            self.replay_branch(&state.blocks, &block, &canonical)
        };
        let snapshot = verified.inspect_err(|e| metrics::record_add(e.reason()))?;

        state.insert(block.clone());
        let outcome = if is_better(&block, &state.tip) {
            info!(
                "[dp-03] New preferred tip {} at height {} (was {})",
                short_hex(&hash),
                block.height,
                state.tip.height
            );
            state.tip = block;
            state.snapshot = Arc::new(snapshot);
            AddOutcome::Adopted
        } else {
            debug!(
                "[dp-03] Pooled block {} at height {} on a side branch",
                short_hex(&hash),
                block.height
            );
            AddOutcome::Pooled
        };

        metrics::set_pooled_blocks(state.blocks.len());
        metrics::record_add(match outcome {
            AddOutcome::Adopted => "adopted",
            AddOutcome::Pooled => "pooled",
            AddOutcome::Duplicate => "duplicate",
        });
        Ok(outcome)
    }

    /// Removes one pooled block, re-selecting the tip if needed.
    pub fn remove_block(&self, hash: &Hash) -> Option<Block> {
        let mut slot = self.state.lock();
        let state = slot.as_mut()?;
        let removed = state.remove(hash)?;
        self.reselect_tip_locked(state);
        metrics::set_pooled_blocks(state.blocks.len());
        Some(removed)
    }

    /// Removes every pooled block at or below `height`.
    pub fn remove_under_height(&self, height: u64) -> usize {
        let mut slot = self.state.lock();
        let Some(state) = slot.as_mut() else {
            return 0;
        };
        let removed = self.remove_under_height_locked(state, height);
        metrics::set_pooled_blocks(state.blocks.len());
        removed
    }

    // === QUERIES ===

    pub fn has_block(&self, hash: &Hash) -> bool {
        self.state
            .lock()
            .as_ref()
            .is_some_and(|s| s.blocks.contains_key(hash))
    }

    pub fn get_block(&self, hash: &Hash) -> Option<Block> {
        self.state
            .lock()
            .as_ref()
            .and_then(|s| s.blocks.get(hash).cloned())
    }

    /// Height of the preferred tip, or 0 before the pool is initialized.
    pub fn tip_height(&self) -> u64 {
        self.state.lock().as_ref().map_or(0, |s| s.tip.height)
    }

    pub fn preferred_tip(&self) -> Block {
        let mut slot = self.state.lock();
        self.init_state(&mut slot).tip.clone()
    }

    /// Preferred tip with the ledger view after it.
    pub fn tip_with_snapshot(&self) -> (Block, Arc<L::Snapshot>) {
        let mut slot = self.state.lock();
        let state = self.init_state(&mut slot);
        (state.tip.clone(), Arc::clone(&state.snapshot))
    }

    /// Private copy of the ledger view after the preferred tip.
    pub fn tip_snapshot(&self) -> L::Snapshot {
        let mut slot = self.state.lock();
        (*self.init_state(&mut slot).snapshot).clone()
    }

    /// Leaf tips of every branch reachable from the canonical tip.
    pub fn fork_tips(&self) -> Vec<Block> {
        let mut slot = self.state.lock();
        let state = self.init_state(&mut slot);
        let canonical = self.ledger.tip();
        let leaves = resolve_leaves(
            &[canonical.hash()],
            &state.blocks,
            canonical.height,
            self.config.safety_distance,
        );
        let tips: Vec<Block> = leaves
            .iter()
            .filter_map(|h| state.blocks.get(h).cloned())
            .collect();
        if tips.is_empty() {
            vec![canonical]
        } else {
            tips
        }
    }

    /// Whether any pooled block contains the transaction.
    pub fn is_tx_pending(&self, tx_hash: &Hash) -> bool {
        self.state
            .lock()
            .as_ref()
            .is_some_and(|s| s.pending.contains(tx_hash))
    }

    pub fn pooled_count(&self) -> usize {
        self.state.lock().as_ref().map_or(0, |s| s.blocks.len())
    }

    /// Number of distinct transactions held by pooled blocks.
    pub fn pending_count(&self) -> usize {
        self.state.lock().as_ref().map_or(0, |s| s.pending.len())
    }

    /// Up to `count` blocks ending at `from`, newest first, following pooled
    /// ancestry and then the canonical chain.
    pub fn branch_window(&self, from: &Hash, count: usize) -> Vec<Block> {
        let slot = self.state.lock();
        let mut window = Vec::with_capacity(count);
        let mut cursor = *from;

        if let Some(state) = slot.as_ref() {
            while window.len() < count {
                let Some(block) = state.blocks.get(&cursor) else {
                    break;
                };
                cursor = block.prev_hash;
                window.push(block.clone());
            }
        }

        let canonical = self.ledger.tip();
        let mut height = match window.last() {
            Some(oldest) => oldest.height.checked_sub(1),
            None if cursor == canonical.hash() => Some(canonical.height),
            None => None,
        };
        while window.len() < count {
            let Some(h) = height else { break };
            let Some(block) = self.ledger.block_at(h) else {
                break;
            };
            if block.hash() != cursor {
                break;
            }
            cursor = block.prev_hash;
            height = h.checked_sub(1);
            window.push(block);
        }
        window
    }

    // === IRREVERSIBILITY ===

    /// Blocks on the preferred branch that are now final, oldest first.
    pub fn determine_irreversible(&self) -> Vec<Block> {
        let mut slot = self.state.lock();
        let state = self.init_state(&mut slot);
        self.irreversible_locked(state)
    }

    /// Commits newly final blocks to the ledger store and purges them.
    ///
    /// A commit failure resets the pool through the consensus-failure path
    /// and is reported as [`ForkPoolError::ConsensusFailure`].
    pub fn advance_irreversible(&self) -> Result<Vec<Block>> {
        let mut slot = self.state.lock();
        let finals = {
            let state = self.init_state(&mut slot);
            self.irreversible_locked(state)
        };
        let Some(highest) = finals.last().map(|b| b.height) else {
            return Ok(finals);
        };

        for block in &finals {
            if let Err(e) = self.ledger.commit_block(block) {
                error!(
                    "[dp-03] Commit of final block {} at height {} failed: {}",
                    short_hex(&block.hash()),
                    block.height,
                    e
                );
                let report = self.reset_locked(&mut slot, block);
                return Err(ForkPoolError::ConsensusFailure {
                    height: block.height,
                    reason: format!("{} ({} transactions re-offered)", e, report.resubmitted),
                });
            }
            for tx_hash in block.tx_hashes() {
                self.mempool.remove(&tx_hash);
            }
        }

        let state = self.init_state(&mut slot);
        self.purge_final_locked(state, highest);
        metrics::record_irreversible(finals.len());
        metrics::set_pooled_blocks(state.blocks.len());
        info!(
            "[dp-03] Committed {} irreversible blocks up to height {}",
            finals.len(),
            highest
        );
        Ok(finals)
    }

    // === RECOVERY ===

    /// Resets the pool after a consensus failure at `failed`.
    ///
    /// Pooled transactions not yet confirmed on the canonical chain are
    /// re-offered to the mempool; reward transactions are dropped.
    pub fn on_consensus_failure(&self, failed: &Block) -> ResubmitReport {
        let mut slot = self.state.lock();
        self.reset_locked(&mut slot, failed)
    }

    // === LOCKED HELPERS ===

    fn init_state<'a>(&self, slot: &'a mut Slot<L::Snapshot>) -> &'a mut PoolState<L::Snapshot> {
        slot.get_or_insert_with(|| {
            let tip = self.ledger.tip();
            debug!(
                "[dp-03] Fork pool initialized at canonical height {}",
                tip.height
            );
            PoolState::rooted_at(tip, self.ledger.snapshot())
        })
    }

    /// Verifies the pooled ancestry of `block` and `block` itself on a fresh
    /// snapshot at the canonical tip, returning the view after `block`.
    fn replay_branch(
        &self,
        blocks: &HashMap<Hash, Block>,
        block: &Block,
        canonical: &Block,
    ) -> Result<L::Snapshot> {
        let canonical_hash = canonical.hash();
        let mut ancestors = Vec::new();
        let mut cursor = block.prev_hash;
        while cursor != canonical_hash {
            match blocks.get(&cursor) {
                Some(parent) if ancestors.len() <= blocks.len() => {
                    cursor = parent.prev_hash;
                    ancestors.push(parent);
                }
                _ => {
                    debug!(
                        "[dp-03] Orphan block {} at height {}: missing {}",
                        short_hex(&block.hash()),
                        block.height,
                        short_hex(&cursor)
                    );
                    return Err(ForkPoolError::Orphan {
                        hash: short_hex(&block.hash()),
                        missing: short_hex(&cursor),
                    });
                }
            }
        }

        let mut snapshot = self.ledger.snapshot();
        let mut predecessor = canonical;
        for current in ancestors.into_iter().rev().chain(std::iter::once(block)) {
            self.verifier
                .verify_block(current, predecessor, &mut snapshot)
                .map_err(|source| ForkPoolError::Verification {
                    hash: short_hex(&current.hash()),
                    source,
                })?;
            predecessor = current;
        }
        Ok(snapshot)
    }

    /// Points the tip at the preferred leaf reachable from the canonical tip.
    fn reselect_tip_locked(&self, state: &mut PoolState<L::Snapshot>) {
        let canonical = self.ledger.tip();
        let canonical_hash = canonical.hash();
        let leaves = resolve_leaves(
            &[canonical_hash],
            &state.blocks,
            canonical.height,
            self.config.safety_distance,
        );
        let preferred = select_preferred(&leaves, &state.blocks).cloned();

        match preferred {
            Some(best) if best.hash() == state.tip.hash() => {}
            Some(best) => match self.replay_branch(&state.blocks, &best, &canonical) {
                Ok(snapshot) => {
                    info!(
                        "[dp-03] Preferred tip moved to {} at height {}",
                        short_hex(&best.hash()),
                        best.height
                    );
                    state.tip = best;
                    state.snapshot = Arc::new(snapshot);
                }
                Err(e) => {
                    warn!(
                        "[dp-03] Replay of new preferred branch failed, falling back to canonical tip: {}",
                        e
                    );
                    state.snapshot = Arc::new(self.ledger.snapshot());
                    state.tip = canonical;
                }
            },
            None => {
                if state.tip.hash() != canonical_hash {
                    state.snapshot = Arc::new(self.ledger.snapshot());
                    state.tip = canonical;
                }
            }
        }
    }

    fn remove_under_height_locked(&self, state: &mut PoolState<L::Snapshot>, height: u64) -> usize {
        let removed = state.remove_under_height(height);
        if removed > 0 {
            debug!(
                "[dp-03] Purged {} pooled blocks at or below height {}",
                removed, height
            );
            self.reselect_tip_locked(state);
        }
        removed
    }

    /// Drops blocks at or below the committed `height` and every branch
    /// that no longer links to the new canonical tip.
    fn purge_final_locked(&self, state: &mut PoolState<L::Snapshot>, height: u64) {
        let below = state.remove_under_height(height);
        let stranded = state.retain_descendants_of(&self.ledger.tip().hash());
        if below + stranded > 0 {
            debug!(
                "[dp-03] Purged {} pooled blocks at or below height {} and {} stranded above it",
                below, height, stranded
            );
            self.reselect_tip_locked(state);
        }
    }

    fn irreversible_locked(&self, state: &mut PoolState<L::Snapshot>) -> Vec<Block> {
        let canonical_hash = self.ledger.tip().hash();
        if state.remove(&canonical_hash).is_some() {
            debug!("[dp-03] Dropped canonical tip from the pool before the irreversibility walk");
        }
        let threshold = self.config.confirm.threshold_at(state.tip.height);
        determine_irreversible(&state.tip, &state.blocks, &canonical_hash, threshold)
    }

    fn reset_locked(&self, slot: &mut Slot<L::Snapshot>, failed: &Block) -> ResubmitReport {
        warn!(
            "[dp-03] Consensus failure at block {} height {}, resetting fork pool",
            short_hex(&failed.hash()),
            failed.height
        );
        metrics::record_consensus_failure();

        let canonical_view = self.ledger.snapshot();
        let mut report = ResubmitReport::default();
        if let Some(state) = slot.as_ref() {
            let mut seen = HashSet::new();
            for block in state.blocks_by_height() {
                for tx in &block.transactions {
                    let tx_hash = tx.hash();
                    if !seen.insert(tx_hash) {
                        continue;
                    }
                    if tx.is_reward() {
                        self.mempool.remove(&tx_hash);
                        report.discarded_rewards += 1;
                        continue;
                    }
                    if canonical_view.is_tx_confirmed(&tx_hash) {
                        report.already_confirmed += 1;
                        continue;
                    }
                    match self.mempool.offer(tx.clone()) {
                        Ok(()) | Err(LedgerError::DuplicateTransaction(_)) => {
                            report.resubmitted += 1;
                        }
                        Err(e) => {
                            debug!(
                                "[dp-03] Dropping tx {} after consensus failure: {}",
                                short_hex(&tx_hash),
                                e
                            );
                            self.mempool.remove(&tx_hash);
                            report.rejected += 1;
                        }
                    }
                }
            }
        }

        *slot = None;
        let state = self.init_state(slot);
        metrics::set_pooled_blocks(0);
        info!(
            "[dp-03] Fork pool reset at canonical height {}: {} re-offered, {} rewards dropped, {} rejected",
            state.tip.height, report.resubmitted, report.discarded_rewards, report.rejected
        );
        report
    }
}
