//! # Test Fixtures
//!
//! [`TestNode`] is one node: its own ledger, mempool, fork pool and block
//! producer over a devnet genesis. Every devnet genesis is identical, so
//! blocks relayed between nodes verify everywhere.
//!
//! [`TestNetwork`] splits the delegate keys across nodes and relays blocks
//! by hand; time is a [`ManualClock`] per node, moved in lockstep.

use dp_02_block_verification::test_utils::{Devnet, BLOCK_INTERVAL, GENESIS_TIME};
use dp_03_fork_pool::{ConfirmPolicy, ForkPool, ForkPoolConfig, ForkPoolDependencies};
use dp_04_block_production::{
    BlockProducer, BlockProductionConfig, MiningConfig, ProducerDependencies,
};
use shared_types::in_memory::{ManualClock, MemoryLedger, MemoryMempool, StaticPeers};
use shared_types::{AccountId, Block, LedgerStore};
use std::sync::Arc;

pub type TestMempool = MemoryMempool<MemoryLedger>;
pub type TestPool = ForkPool<MemoryLedger, TestMempool>;
pub type TestProducer = BlockProducer<MemoryLedger, TestMempool>;

/// Timestamp of the `k`-th slot after genesis.
pub fn slot(k: u64) -> u64 {
    GENESIS_TIME + k * BLOCK_INTERVAL
}

/// One node over its own in-memory ledger.
pub struct TestNode {
    pub devnet: Devnet,
    pub clock: Arc<ManualClock>,
    pub mempool: Arc<TestMempool>,
    pub pool: Arc<TestPool>,
    pub producer: Arc<TestProducer>,
    keys: Vec<AccountId>,
}

impl TestNode {
    /// Node over `delegates` delegates, holding the keys at `keys`.
    pub fn new(delegates: usize, keys: &[usize], confirm: ConfirmPolicy) -> Self {
        let devnet = Devnet::new(delegates);
        let clock = Arc::new(ManualClock::new(GENESIS_TIME));
        let mempool = Arc::new(MemoryMempool::new(
            Arc::clone(&devnet.ledger),
            clock.clone(),
        ));
        let pool = Arc::new(ForkPool::new(ForkPoolDependencies {
            ledger: Arc::clone(&devnet.ledger),
            mempool: Arc::clone(&mempool),
            verifier: Arc::new(devnet.verifier()),
            config: ForkPoolConfig {
                confirm,
                ..Default::default()
            },
        }));
        let producer = BlockProducer::new(ProducerDependencies {
            pool: Arc::clone(&pool),
            mempool: Arc::clone(&mempool),
            signer: Arc::new(devnet.keyring_for(keys)),
            clock: clock.clone(),
            network: Arc::new(StaticPeers::new(1)),
            config: BlockProductionConfig {
                mining: MiningConfig {
                    allow_solo: true,
                    ..Default::default()
                },
                ..Default::default()
            },
        })
        .expect("default production config is valid");
        let keys = keys.iter().map(|i| devnet.delegates[*i]).collect();

        Self {
            devnet,
            clock,
            mempool,
            pool,
            producer: Arc::new(producer),
            keys,
        }
    }

    pub fn holds_key(&self, delegate: AccountId) -> bool {
        self.keys.contains(&delegate)
    }

    /// Delegate scheduled to extend this node's preferred tip at `timestamp`.
    pub fn scheduled_producer(&self, timestamp: u64) -> AccountId {
        let (tip, snapshot) = self.pool.tip_with_snapshot();
        self.devnet
            .schedule
            .expected_producer(tip.height + 1, timestamp, &*snapshot)
            .expect("devnet delegates resolve")
    }

    /// Canonical (committed) height.
    pub fn ledger_height(&self) -> u64 {
        self.devnet.ledger.tip().height
    }
}

/// Nodes sharing one devnet genesis, with the delegate keys split among them.
pub struct TestNetwork {
    pub nodes: Vec<TestNode>,
}

impl TestNetwork {
    pub fn new(delegates: usize, key_split: &[&[usize]], confirm: ConfirmPolicy) -> Self {
        let nodes = key_split
            .iter()
            .map(|keys| TestNode::new(delegates, keys, confirm.clone()))
            .collect();
        Self { nodes }
    }

    pub fn set_time(&self, timestamp: u64) {
        for node in &self.nodes {
            node.clock.set(timestamp);
        }
    }

    /// Delivers `block` to every node except `from`.
    pub fn broadcast(&self, from: usize, block: &Block) {
        for (i, node) in self.nodes.iter().enumerate() {
            if i != from {
                node.pool
                    .add_block(block.clone())
                    .expect("relayed block is accepted");
            }
        }
    }

    /// Produces the block of the slot at `timestamp` on the node holding the
    /// scheduled key, and relays it to the others.
    pub async fn produce_slot(&self, timestamp: u64) -> Block {
        self.set_time(timestamp);
        let producer = self.nodes[0].scheduled_producer(timestamp);
        let (index, node) = self
            .nodes
            .iter()
            .enumerate()
            .find(|(_, node)| node.holds_key(producer))
            .expect("some node holds every delegate key");
        let block = node
            .producer
            .produce_once()
            .await
            .expect("scheduled node produces");
        self.broadcast(index, &block);
        block
    }

    /// Runs the finality driver on every node; returns committed heights.
    pub fn finalize_all(&self) -> Vec<u64> {
        self.nodes
            .iter()
            .map(|node| {
                node.pool
                    .advance_irreversible()
                    .expect("final blocks commit");
                node.ledger_height()
            })
            .collect()
    }

    /// True when every node prefers the same tip.
    pub fn converged(&self) -> bool {
        let tips: Vec<Block> = self.nodes.iter().map(|n| n.pool.preferred_tip()).collect();
        tips.windows(2).all(|pair| pair[0] == pair[1])
    }
}

