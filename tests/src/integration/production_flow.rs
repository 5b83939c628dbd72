//! # Production Flow
//!
//! Block producers on several nodes take turns by delegate slot, relay their
//! blocks, and the finality driver commits the agreed prefix everywhere.
//!
//! ## Flows Tested
//!
//! 1. **Mempool → block → ledger**: a submitted transaction is packed, relayed
//!    and, once final, confirmed on every node and dropped from mempools.
//! 2. **Slot ownership**: each block is produced by the node holding the
//!    scheduled delegate's key, and no node produces for a foreign slot.
//! 3. **Fuel rate bootstrap**: early blocks carry the initial fuel rate.

#[cfg(test)]
mod tests {
    use crate::fixtures::{slot, TestNetwork};
    use dp_03_fork_pool::ConfirmPolicy;
    use dp_04_block_production::BlockProductionError;
    use shared_types::{LedgerSnapshot, LedgerStore, Mempool, INITIAL_FUEL_RATE};

    const SLOTS: u64 = 6;

    #[tokio::test]
    async fn test_transaction_reaches_every_ledger() {
        let net = TestNetwork::new(3, &[&[0], &[1], &[2]], ConfirmPolicy::fixed(2));
        let tx = net.nodes[0].devnet.transfer(0, 1, 500, 2_000);
        for node in &net.nodes {
            node.mempool.offer(tx.clone()).unwrap();
        }

        let first = net.produce_slot(slot(1)).await;
        assert!(first.tx_hashes().any(|h| h == tx.hash()));
        for k in 2..=SLOTS {
            net.produce_slot(slot(k)).await;
        }
        assert!(net.converged());

        let heights = net.finalize_all();
        assert!(heights[0] >= 1);
        assert!(heights.windows(2).all(|pair| pair[0] == pair[1]));

        for node in &net.nodes {
            assert!(node.devnet.ledger.snapshot().is_tx_confirmed(&tx.hash()));
            assert!(!node.mempool.contains(&tx.hash()));
            assert_eq!(node.devnet.ledger.block_at(1), Some(first.clone()));
        }
    }

    #[tokio::test]
    async fn test_each_slot_produced_by_key_holder() {
        let net = TestNetwork::new(3, &[&[0, 1], &[2]], ConfirmPolicy::fixed(2));

        for k in 1..=SLOTS {
            let expected = net.nodes[0].scheduled_producer(slot(k));
            let block = net.produce_slot(slot(k)).await;
            assert_eq!(block.producer(), Some(expected));
            assert_eq!(block.timestamp, slot(k));
            assert_eq!(block.height, k);
        }

        let produced: u64 = net
            .nodes
            .iter()
            .map(|n| n.producer.status().blocks_produced)
            .sum();
        assert_eq!(produced, SLOTS);
        assert_eq!(net.nodes[1].pool.tip_height(), SLOTS);
    }

    #[test]
    fn test_foreign_slot_is_not_produced() {
        let net = TestNetwork::new(3, &[&[0], &[1, 2]], ConfirmPolicy::fixed(2));
        let solo = &net.nodes[0];
        let foreign = (1..)
            .map(slot)
            .find(|ts| !solo.holds_key(solo.scheduled_producer(*ts)))
            .unwrap();
        solo.clock.set(foreign);

        let candidate = solo.producer.build_candidate();
        let err = solo.producer.attempt_slot(&candidate).unwrap_err();
        assert!(matches!(err, BlockProductionError::NotScheduled { .. }));
        assert_eq!(solo.pool.tip_height(), 0);
    }

    #[tokio::test]
    async fn test_bootstrap_blocks_use_initial_fuel_rate() {
        let net = TestNetwork::new(3, &[&[0, 1, 2]], ConfirmPolicy::fixed(2));
        for k in 1..=SLOTS {
            let block = net.produce_slot(slot(k)).await;
            assert_eq!(block.fuel_rate, INITIAL_FUEL_RATE);
        }
        let mined = net.nodes[0].producer.mined_blocks(SLOTS as usize);
        assert_eq!(mined.len(), SLOTS as usize);
        assert_eq!(mined[0].height, SLOTS);
    }
}
