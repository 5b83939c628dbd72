//! # Node Runtime
//!
//! Owns the subsystem graph and its background tasks.
//!
//! ## Initialization Order
//!
//! 1. Genesis block and ledger (in memory)
//! 2. Delegate schedule and block verifier
//! 3. Mempool and fork pool
//! 4. Block producer
//!
//! ## Tasks
//!
//! - Block production loop (dp-04), when mining is enabled
//! - Finality driver: advances irreversibility on a fixed interval and
//!   commits final blocks to the ledger

use crate::config::NodeConfig;
use crate::error::Result;
use crate::genesis::{local_keyring, GenesisBuilder};
use dp_01_delegate_schedule::DelegateSchedule;
use dp_02_block_verification::{BlockVerifier, VerifierConfig};
use dp_03_fork_pool::{AddOutcome, ForkPool, ForkPoolDependencies};
use dp_04_block_production::{BlockProducer, ProducerDependencies};
use parking_lot::Mutex;
use shared_types::in_memory::{MemoryLedger, MemoryMempool, StaticPeers, SystemTimeSource};
use shared_types::{
    short_hex, AccountId, Block, Hash, LedgerError, Mempool, TimeSource, Transaction,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub type NodeMempool = MemoryMempool<MemoryLedger>;
pub type NodePool = ForkPool<MemoryLedger, NodeMempool>;
pub type NodeProducer = BlockProducer<MemoryLedger, NodeMempool>;

/// The node runtime wiring every subsystem over in-memory collaborators.
pub struct NodeRuntime {
    config: NodeConfig,
    genesis_hash: Hash,
    delegates: Vec<AccountId>,
    ledger: Arc<MemoryLedger>,
    mempool: Arc<NodeMempool>,
    pool: Arc<NodePool>,
    producer: Arc<NodeProducer>,
    peers: Arc<StaticPeers>,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver.
    shutdown_rx: watch::Receiver<bool>,
    finality_task: Mutex<Option<JoinHandle<()>>>,
}

impl NodeRuntime {
    pub fn new(config: NodeConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemTimeSource))
    }

    /// Builds the runtime on an explicit clock.
    pub fn with_clock(config: NodeConfig, clock: Arc<dyn TimeSource>) -> Result<Self> {
        config.validate()?;
        info!(
            "Creating DPoS node runtime ({} delegates, {}s slots)",
            config.schedule.total_delegates, config.schedule.block_interval_secs
        );

        let genesis = GenesisBuilder::new(&config, clock.now()).build();
        let genesis_hash = genesis.block.hash();
        let delegates = genesis.delegates.clone();

        let local = config.local_delegate_indexes();
        let keyring = Arc::new(local_keyring(&local));
        info!("Holding keys for {} local delegate(s)", local.len());

        let schedule = Arc::new(DelegateSchedule::new(config.schedule.clone())?);
        let verifier = Arc::new(BlockVerifier::new(
            VerifierConfig {
                genesis_hash,
                ..config.verifier.clone()
            },
            schedule,
            keyring.clone(),
        )
        .with_clock(clock.clone()));

        let ledger = Arc::new(MemoryLedger::new(genesis.block, genesis.state));
        let mempool = Arc::new(MemoryMempool::new(Arc::clone(&ledger), clock.clone()));
        let pool = Arc::new(ForkPool::new(ForkPoolDependencies {
            ledger: Arc::clone(&ledger),
            mempool: Arc::clone(&mempool),
            verifier,
            config: config.fork_pool.clone(),
        }));

        let peers = Arc::new(StaticPeers::new(config.node.static_peers));
        let producer = Arc::new(BlockProducer::new(ProducerDependencies {
            pool: Arc::clone(&pool),
            mempool: Arc::clone(&mempool),
            signer: keyring,
            clock,
            network: peers.clone(),
            config: config.production.clone(),
        })?);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            genesis_hash,
            delegates,
            ledger,
            mempool,
            pool,
            producer,
            peers,
            shutdown_tx,
            shutdown_rx,
            finality_task: Mutex::new(None),
        })
    }

    /// Starts block production (if enabled) and the finality driver.
    pub async fn start(&self) -> Result<()> {
        info!("Genesis {}", hex::encode(self.genesis_hash));

        if self.config.node.mining_enabled {
            self.producer.start()?;
        } else {
            info!("[dp-04] Mining disabled");
        }

        let pool = Arc::clone(&self.pool);
        let mut shutdown = self.shutdown_rx.clone();
        let period = Duration::from_millis(self.config.node.finality_interval_ms);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => drive_finality(&pool),
                    _ = shutdown.changed() => {
                        info!("[dp-03] Shutdown signal received");
                        break;
                    }
                }
            }
        });
        *self.finality_task.lock() = Some(handle);

        info!("Node runtime started");
        Ok(())
    }

    /// Stops the producer, then the finality driver.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        self.producer.stop().await;

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
        let handle = self.finality_task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Finality driver ended abnormally: {}", e);
            }
        }
        info!("Shutdown complete");
    }

    /// Offers a transaction to the mempool.
    pub fn submit_transaction(&self, tx: Transaction) -> std::result::Result<(), LedgerError> {
        self.mempool.offer(tx)
    }

    /// Entry point for blocks received from the network.
    pub fn receive_block(&self, block: Block) -> dp_03_fork_pool::Result<AddOutcome> {
        self.pool.add_block(block)
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn genesis_hash(&self) -> Hash {
        self.genesis_hash
    }

    pub fn delegates(&self) -> &[AccountId] {
        &self.delegates
    }

    pub fn ledger(&self) -> &Arc<MemoryLedger> {
        &self.ledger
    }

    pub fn pool(&self) -> &Arc<NodePool> {
        &self.pool
    }

    pub fn producer(&self) -> &Arc<NodeProducer> {
        &self.producer
    }

    /// Peer count the mining gate sees.
    pub fn set_peer_count(&self, count: usize) {
        self.peers.set(count);
    }
}

fn drive_finality(pool: &NodePool) {
    match pool.advance_irreversible() {
        Ok(finals) => {
            if let Some(last) = finals.last() {
                info!(
                    "[dp-03] {} block(s) final up to height {} ({})",
                    finals.len(),
                    last.height,
                    short_hex(&last.hash())
                );
            }
        }
        Err(e) => warn!("[dp-03] Finality round failed: {}", e),
    }
}
