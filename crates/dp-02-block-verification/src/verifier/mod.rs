//! # Block Verifier
//!
//! Validates a block against its predecessor and the ledger view rooted at
//! that predecessor. On success the view is advanced past the block.

use crate::config::VerifierConfig;
use crate::error::{Result, VerificationError};
use crate::metrics;
use dp_01_delegate_schedule::DelegateSchedule;
use shared_types::{
    fuel, short_hex, AccountId, Block, BlockSigner, ExecutionContext, Hash, LedgerSnapshot,
    TimeSource,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};


/// Summary of an accepted block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockReceipt {
    pub hash: Hash,
    pub height: u64,
    pub producer: AccountId,
    pub total_fuel: u64,
    pub total_run_steps: u64,
    /// Sum of `fees - fuel` over the non-reward transactions.
    pub reward: u64,
    pub tx_count: usize,
}

/// Block acceptance rules.
pub struct BlockVerifier {
    config: VerifierConfig,
    schedule: Arc<DelegateSchedule>,
    signer: Arc<dyn BlockSigner>,
    /// Local clock bounding how far ahead a block may be stamped.
    clock: Option<Arc<dyn TimeSource>>,
}

impl BlockVerifier {
    pub fn new(
        config: VerifierConfig,
        schedule: Arc<DelegateSchedule>,
        signer: Arc<dyn BlockSigner>,
    ) -> Self {
        Self {
            config,
            schedule,
            signer,
            clock: None,
        }
    }

    /// Rejects blocks stamped more than `max_future_secs` past `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn schedule(&self) -> &Arc<DelegateSchedule> {
        &self.schedule
    }

    /// Verifies `block` on top of `predecessor`.
    ///
    /// `snapshot` must be the ledger view after `predecessor`. It is only
    /// replaced by the post-block view when every check passes.
    #[instrument(skip_all, fields(height = block.height))]
    pub fn verify_block<S: LedgerSnapshot>(
        &self,
        block: &Block,
        predecessor: &Block,
        snapshot: &mut S,
    ) -> Result<BlockReceipt> {
        let started = Instant::now();
        let result = self.run_checks(block, predecessor, snapshot);
        metrics::record_verification_latency(started.elapsed().as_secs_f64());

        match &result {
            Ok(receipt) => {
                metrics::record_block_verified();
                debug!(
                    "[dp-02] Block {} at height {} by {} accepted ({} txs, fuel {})",
                    short_hex(&receipt.hash),
                    receipt.height,
                    receipt.producer,
                    receipt.tx_count,
                    receipt.total_fuel
                );
            }
            Err(e) => {
                metrics::record_block_rejected(e.reason());
                warn!(
                    "[dp-02] Block {} at height {} rejected: {}",
                    short_hex(&block.hash()),
                    block.height,
                    e
                );
            }
        }
        result
    }

    fn run_checks<S: LedgerSnapshot>(
        &self,
        block: &Block,
        predecessor: &Block,
        snapshot: &mut S,
    ) -> Result<BlockReceipt> {
        self.check_linkage(block, predecessor)?;
        self.check_timestamp(block, predecessor)?;
        let claimed = self.check_shape(block)?;

        if block.nonce > self.config.max_nonce {
            return Err(VerificationError::NonceTooLarge {
                nonce: block.nonce,
                max: self.config.max_nonce,
            });
        }

        if block.compute_merkle_root() != block.merkle_root {
            return Err(VerificationError::MerkleRootMismatch);
        }

        let size = block.serialized_size();
        if size > self.config.max_block_size {
            return Err(VerificationError::BlockTooLarge {
                size,
                max: self.config.max_block_size,
            });
        }

        let expected =
            self.schedule
                .expected_producer(block.height, block.timestamp, &*snapshot)?;

        self.check_double_production(block, predecessor, expected)?;

        if claimed != expected {
            return Err(VerificationError::WrongProducer {
                expected,
                actual: claimed,
            });
        }

        self.check_signature(block, expected, &*snapshot)?;

        for (index, tx) in block.transactions.iter().enumerate() {
            if tx.version != self.config.tx_version {
                return Err(VerificationError::UnsupportedTxVersion {
                    index,
                    version: tx.version,
                });
            }
        }

        let totals = self.replay(block, snapshot)?;
        Ok(BlockReceipt {
            hash: block.hash(),
            height: block.height,
            producer: expected,
            total_fuel: totals.fuel,
            total_run_steps: totals.run_steps,
            reward: totals.reward,
            tx_count: block.transactions.len(),
        })
    }

    fn check_linkage(&self, block: &Block, predecessor: &Block) -> Result<()> {
        let expected = predecessor.height + 1;
        if block.height != expected {
            return Err(VerificationError::HeightMismatch {
                expected,
                actual: block.height,
            });
        }
        if block.prev_hash != predecessor.hash() {
            return Err(VerificationError::PrevHashMismatch);
        }
        Ok(())
    }

    fn check_timestamp(&self, block: &Block, predecessor: &Block) -> Result<()> {
        if block.timestamp < predecessor.timestamp {
            return Err(VerificationError::TimestampBeforePredecessor {
                timestamp: block.timestamp,
                predecessor: predecessor.timestamp,
            });
        }
        if let Some(clock) = &self.clock {
            let limit = clock.now().saturating_add(self.config.max_future_secs);
            if block.timestamp > limit {
                return Err(VerificationError::TimestampTooFarAhead {
                    timestamp: block.timestamp,
                    limit,
                });
            }
        }
        Ok(())
    }

    /// Returns the producer named by the reward transaction.
    fn check_shape(&self, block: &Block) -> Result<AccountId> {
        let first = block
            .transactions
            .first()
            .ok_or(VerificationError::EmptyBlock)?;
        if !first.is_reward() {
            return Err(VerificationError::MissingReward);
        }
        Ok(first.signer)
    }

    fn check_double_production(
        &self,
        block: &Block,
        predecessor: &Block,
        expected: AccountId,
    ) -> Result<()> {
        if block.height == 1 && block.prev_hash == self.config.genesis_hash {
            return Ok(());
        }

        let interval = self.schedule.block_interval(block.height);
        let elapsed = block.timestamp.saturating_sub(predecessor.timestamp);
        if elapsed < interval && predecessor.producer() == Some(expected) {
            return Err(VerificationError::DoubleProduction {
                producer: expected,
                elapsed,
                interval,
            });
        }
        Ok(())
    }

    fn check_signature<S: LedgerSnapshot>(
        &self,
        block: &Block,
        producer: AccountId,
        snapshot: &S,
    ) -> Result<()> {
        let account = snapshot
            .account(&producer)
            .ok_or(VerificationError::UnknownProducer(producer))?;

        let size = block.signature.len();
        if size == 0 || size > self.config.max_signature_size {
            return Err(VerificationError::InvalidSignatureSize {
                size,
                max: self.config.max_signature_size,
            });
        }

        let sig_hash = block.signature_hash();
        let valid = account
            .signing_keys()
            .any(|key| self.signer.verify(&sig_hash, &block.signature, key));
        if !valid {
            return Err(VerificationError::InvalidSignature);
        }
        Ok(())
    }

    /// Replays the non-reward transactions on a trial copy of `snapshot`.
    fn replay<S: LedgerSnapshot>(&self, block: &Block, snapshot: &mut S) -> Result<ReplayTotals> {
        let mut trial = snapshot.clone();
        let mut totals = ReplayTotals::default();

        for (index, tx) in block.transactions.iter().enumerate().skip(1) {
            if tx.is_reward() {
                return Err(VerificationError::ExtraReward { index });
            }

            let tx_hash = tx.hash();
            if trial.is_tx_confirmed(&tx_hash) {
                return Err(VerificationError::DuplicateTransaction {
                    index,
                    tx_hash: short_hex(&tx_hash),
                });
            }

            let ctx = ExecutionContext {
                height: block.height,
                index,
                fuel_rate: block.fuel_rate,
            };
            let receipt = trial.execute(tx, ctx).map_err(|e| {
                warn!(
                    "[dp-02] Execution failed at height {} for tx {}: {}",
                    block.height,
                    short_hex(&tx_hash),
                    e
                );
                VerificationError::ExecutionFailed {
                    index,
                    tx_hash: short_hex(&tx_hash),
                    reason: e.to_string(),
                }
            })?;

            totals.run_steps = totals.run_steps.saturating_add(receipt.run_steps);
            if totals.run_steps > self.config.max_block_run_steps {
                return Err(VerificationError::RunStepsExceeded {
                    steps: totals.run_steps,
                    max: self.config.max_block_run_steps,
                });
            }

            let tx_fuel = fuel(receipt.run_steps, block.fuel_rate);
            totals.fuel = totals.fuel.saturating_add(tx_fuel);
            totals.reward = totals.reward.saturating_add(tx.fees.saturating_sub(tx_fuel));
        }

        if totals.fuel != block.fuel {
            return Err(VerificationError::FuelMismatch {
                declared: block.fuel,
                computed: totals.fuel,
            });
        }

        let declared = block.transactions[0].amount;
        if declared != totals.reward {
            return Err(VerificationError::RewardMismatch {
                declared,
                computed: totals.reward,
            });
        }

        *snapshot = trial;
        Ok(totals)
    }
}

#[derive(Debug, Default)]
struct ReplayTotals {
    fuel: u64,
    run_steps: u64,
    reward: u64,
}
