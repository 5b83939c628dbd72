//! Block Producer Service - candidate building and the mining loop
//!
//! # Architecture
//! - `build_candidate` packs mempool transactions on the fork pool's
//!   preferred tip without holding the pool lock.
//! - `mine_candidate` polls until the candidate's slot opens, then seals the
//!   block for whichever delegate the schedule names, if this node holds that
//!   delegate's key, and submits it through `ForkPool::add_block`, the same
//!   path network blocks take.
//! - `start` runs the loop on a tokio task; `stop` aborts it at its next
//!   sleep.

use crate::config::BlockProductionConfig;
use crate::domain::{
    prioritize, seal, BlockCandidate, FuelRateAdjuster, MinedBlockInfo, MinedHistory,
    PackingLimits, SealParams, TransactionPacker,
};
use crate::error::{BlockProductionError, Result};
use crate::metrics;
use dp_01_delegate_schedule::DelegateSchedule;
use dp_03_fork_pool::{AddOutcome, ForkPool};
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use shared_types::{
    short_hex, Block, BlockSigner, Hash, LedgerSnapshot, LedgerStore, Mempool, NetworkStatus,
    TimeSource,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, instrument, warn};


/// How the last production attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Produced { height: u64, hash: Hash },
    Abandoned { reason: &'static str },
}

/// Producer state for status queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProducerStatus {
    pub running: bool,
    pub blocks_produced: u64,
    pub last_outcome: Option<AttemptOutcome>,
    /// Height at which the loop stops, when a target was configured
    pub stop_height: Option<u64>,
}

/// Dependencies for BlockProducer
pub struct ProducerDependencies<L: LedgerStore, M: Mempool> {
    pub pool: Arc<ForkPool<L, M>>,
    pub mempool: Arc<M>,
    pub signer: Arc<dyn BlockSigner>,
    pub clock: Arc<dyn TimeSource>,
    pub network: Arc<dyn NetworkStatus>,
    pub config: BlockProductionConfig,
}

/// DPoS block producer over a fork pool.
pub struct BlockProducer<L: LedgerStore, M: Mempool> {
    pool: Arc<ForkPool<L, M>>,
    mempool: Arc<M>,
    signer: Arc<dyn BlockSigner>,
    clock: Arc<dyn TimeSource>,
    network: Arc<dyn NetworkStatus>,
    config: BlockProductionConfig,
    fuel_rate: FuelRateAdjuster,
    running: AtomicBool,
    status: RwLock<ProducerStatus>,
    history: Mutex<MinedHistory>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<L: LedgerStore, M: Mempool> BlockProducer<L, M> {
    pub fn new(deps: ProducerDependencies<L, M>) -> Result<Self> {
        deps.config.validate()?;
        let fuel_rate = FuelRateAdjuster::new(
            deps.config.fuel_rate.clone(),
            deps.pool.verifier().config().max_block_run_steps,
        );
        let history = MinedHistory::new(deps.config.mining.history_capacity);
        Ok(Self {
            pool: deps.pool,
            mempool: deps.mempool,
            signer: deps.signer,
            clock: deps.clock,
            network: deps.network,
            config: deps.config,
            fuel_rate,
            running: AtomicBool::new(false),
            status: RwLock::new(ProducerStatus::default()),
            history: Mutex::new(history),
            task: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &BlockProductionConfig {
        &self.config
    }

    fn schedule(&self) -> &Arc<DelegateSchedule> {
        self.pool.verifier().schedule()
    }

    // === CANDIDATE ===

    /// Packs a block on the preferred tip.
    #[instrument(skip_all)]
    pub fn build_candidate(&self) -> BlockCandidate {
        let mempool_counter = self.mempool.update_counter();
        let (tip, snapshot) = self.pool.tip_with_snapshot();
        let height = tip.height + 1;

        let window = self.pool.branch_window(&tip.hash(), self.fuel_rate.window());
        let fuel_rate = self.fuel_rate.next_rate(&tip, &window);
        metrics::set_fuel_rate(fuel_rate);

        let candidates = prioritize(
            self.mempool.pending(),
            &*snapshot,
            self.config.price_boost,
            fuel_rate,
        );
        let verifier = self.pool.verifier().config();
        let limits = PackingLimits {
            max_block_size: self
                .config
                .effective_max_block_size(verifier.max_block_size),
            max_block_run_steps: verifier.max_block_run_steps,
        };
        let interval = self.schedule().block_interval(height);
        let deadline = std::time::Instant::now() + Duration::from_secs(interval.saturating_sub(1));
        let base_size = BlockCandidate::skeleton(&tip, fuel_rate).serialized_size();

        let packed = TransactionPacker::new(limits, height, fuel_rate).pack(
            candidates,
            (*snapshot).clone(),
            base_size,
            |h| self.pool.is_tx_pending(h),
            deadline,
        );
        let candidate = BlockCandidate::assemble(tip, fuel_rate, packed, mempool_counter);
        info!(
            "[dp-04] Candidate for height {} on {}: {} txs, {} bytes, fuel rate {}",
            height,
            short_hex(&candidate.prev_hash()),
            candidate.tx_count(),
            candidate.block_size,
            fuel_rate
        );
        candidate
    }

    // === MINING ===

    /// One sealing attempt at the current time.
    ///
    /// Fails with [`BlockProductionError::NotScheduled`] when the slot's
    /// delegate is not ours and with [`BlockProductionError::TipChanged`]
    /// when the candidate no longer builds on the preferred tip.
    pub fn attempt_slot(&self, candidate: &BlockCandidate) -> Result<Block> {
        let (tip, snapshot) = self.pool.tip_with_snapshot();
        if tip.hash() != candidate.prev_hash() {
            return Err(BlockProductionError::TipChanged);
        }

        let now = self.clock.now();
        let height = candidate.height();
        let delegate = self.schedule().expected_producer(height, now, &*snapshot)?;
        let account = snapshot
            .account(&delegate)
            .ok_or(BlockProductionError::UnknownDelegate(delegate))?;

        let verifier = self.pool.verifier().config();
        let nonce = rand::thread_rng().gen_range(0..=verifier.max_nonce);
        let block = seal(
            candidate,
            SealParams {
                producer: &account,
                timestamp: now,
                nonce,
                interval: self.schedule().block_interval(height),
                genesis_hash: verifier.genesis_hash,
            },
            &*self.signer,
        )?;

        let outcome = self.pool.add_block(block.clone())?;
        let hash = block.hash();
        info!(
            "[dp-04] Produced block {} at height {} as {} ({} txs, {:?})",
            short_hex(&hash),
            height,
            delegate,
            block.transactions.len(),
            outcome
        );
        if outcome == AddOutcome::Pooled {
            warn!(
                "[dp-04] Produced block {} did not become the preferred tip",
                short_hex(&hash)
            );
        }

        self.history.lock().record(MinedBlockInfo::new(
            &block,
            candidate.total_fees,
            block.serialized_size(),
        ));
        {
            let mut status = self.status.write();
            status.blocks_produced += 1;
            status.last_outcome = Some(AttemptOutcome::Produced { height, hash });
        }
        metrics::record_block_produced(block.transactions.len());
        Ok(block)
    }

    /// Retries [`BlockProducer::attempt_slot`] until it succeeds, the tip or
    /// mempool moves, peers drop, or the attempt times out.
    pub async fn mine_candidate(&self, candidate: &BlockCandidate) -> Result<Block> {
        let started = Instant::now();
        let timeout = Duration::from_secs(self.config.mining.attempt_timeout_secs);
        let poll = Duration::from_millis(self.config.mining.poll_interval_ms);
        let start_at = self
            .schedule()
            .next_slot_time(candidate.height(), candidate.predecessor.timestamp);

        loop {
            self.check_peers()?;

            if self.clock.now() >= start_at {
                match self.attempt_slot(candidate) {
                    Ok(block) => return Ok(block),
                    Err(e @ BlockProductionError::NotScheduled { .. })
                    | Err(e @ BlockProductionError::DoubleProduction { .. }) => {
                        debug!("[dp-04] Slot skipped at height {}: {}", candidate.height(), e);
                    }
                    Err(e) => return Err(e),
                }
            } else if self.pool.preferred_tip().hash() != candidate.prev_hash() {
                return Err(BlockProductionError::TipChanged);
            }

            if self.mempool.update_counter() != candidate.mempool_counter {
                return Err(BlockProductionError::StaleMempool);
            }
            if started.elapsed() >= timeout {
                return Err(BlockProductionError::Timeout {
                    secs: self.config.mining.attempt_timeout_secs,
                });
            }
            sleep(poll).await;
        }
    }

    /// Builds one candidate on the preferred tip and mines it.
    pub async fn produce_once(&self) -> Result<Block> {
        let result = self.try_produce().await;
        if let Err(e) = &result {
            metrics::record_attempt_failed(e.reason());
            self.status.write().last_outcome = Some(AttemptOutcome::Abandoned {
                reason: e.reason(),
            });
        }
        result
    }

    async fn try_produce(&self) -> Result<Block> {
        self.check_peers()?;
        self.check_tip_fresh(&self.pool.preferred_tip())?;
        let candidate = self.build_candidate();
        self.mine_candidate(&candidate).await
    }

    fn check_peers(&self) -> Result<()> {
        if !self.config.mining.allow_solo && self.network.peer_count() == 0 {
            return Err(BlockProductionError::NoPeers);
        }
        Ok(())
    }

    fn check_tip_fresh(&self, tip: &Block) -> Result<()> {
        if self.config.mining.force || tip.height <= 1 {
            return Ok(());
        }
        let age_secs = self.clock.now().saturating_sub(tip.timestamp);
        if age_secs > self.config.mining.stale_tip_secs {
            return Err(BlockProductionError::StaleTip { age_secs });
        }
        Ok(())
    }

    // === LIFECYCLE ===

    /// Starts the mining loop on a background task.
    ///
    /// Refuses when the keyring holds no key. Starting twice is a no-op.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        if !self.signer.has_any_key() {
            error!("[dp-04] Refusing to start: no signing key available");
            return Err(BlockProductionError::NoSigningKey);
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let stop_height = self
            .config
            .mining
            .target_height
            .map(|target| self.pool.preferred_tip().height + target);
        {
            let mut status = self.status.write();
            status.running = true;
            status.stop_height = stop_height;
        }

        let this = Arc::clone(self);
        let handle = tokio::spawn(async move { this.run(stop_height).await });
        *self.task.lock() = Some(handle);
        info!("[dp-04] Block production started (stop height {:?})", stop_height);
        Ok(())
    }

    async fn run(&self, stop_height: Option<u64>) {
        let idle = Duration::from_millis(self.config.mining.poll_interval_ms);
        while self.running.load(Ordering::SeqCst) {
            match self.produce_once().await {
                Ok(_) => {}
                Err(e) if e.is_critical() => {
                    error!("[dp-04] Block production stopping: {}", e);
                    break;
                }
                Err(e) if e.is_transient() => {
                    debug!("[dp-04] Attempt abandoned: {}", e);
                    sleep(idle).await;
                }
                Err(e) => {
                    warn!("[dp-04] Attempt failed: {}", e);
                    sleep(idle).await;
                }
            }

            if let Some(stop) = stop_height {
                if self.pool.tip_height() >= stop {
                    info!("[dp-04] Target height {} reached", stop);
                    break;
                }
            }
        }
        self.running.store(false, Ordering::SeqCst);
        self.status.write().running = false;
    }

    /// Stops the mining loop and waits for the task to finish.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
        }
        self.status.write().running = false;
        info!("[dp-04] Block production stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> ProducerStatus {
        self.status.read().clone()
    }

    /// Up to `count` produced blocks, newest first.
    pub fn mined_blocks(&self, count: usize) -> Vec<MinedBlockInfo> {
        self.history.lock().latest(count)
    }
}
