//! # Fork Resolution Across Nodes
//!
//! Nodes that see the same blocks in different orders, or only part of them,
//! must settle on the same preferred tip once every block has been relayed.
//!
//! ## Flows Tested
//!
//! 1. **Partition heal**: the longer branch wins on both sides.
//! 2. **Tie break**: equal heights resolve to the earliest timestamp
//!    regardless of delivery order.
//! 3. **Orphans**: a child delivered before its parent is refused, then
//!    accepted once the parent arrives.
//! 4. **Tampering**: a modified block is rejected and leaves the pool alone.
//! 5. **Finality prune**: committing the winning branch frees transactions
//!    that were only pending on the losing one.

#[cfg(test)]
mod tests {
    use crate::fixtures::{TestNetwork, TestNode};
    use dp_02_block_verification::test_utils::BLOCK_INTERVAL;
    use dp_03_fork_pool::{AddOutcome, ConfirmPolicy, ForkPoolError};
    use shared_types::{AccountId, Block, LedgerSnapshot, LedgerStore, Mempool};

    /// Delegates 0..n of `node`, ordered by their first slot at height 1.
    fn by_first_slot(node: &TestNode, n: usize) -> Vec<AccountId> {
        let genesis = node.devnet.genesis();
        let mut slots: Vec<(u64, AccountId)> = node.devnet.delegates[..n]
            .iter()
            .map(|d| {
                let ts = node
                    .devnet
                    .slot_time_for(1, genesis.timestamp + BLOCK_INTERVAL, *d);
                (ts, *d)
            })
            .collect();
        slots.sort();
        slots.into_iter().map(|(_, d)| d).collect()
    }

    // =============================================================================
    // CONVERGENCE
    // =============================================================================

    #[test]
    fn test_partitioned_nodes_converge_on_longer_branch() {
        let net = TestNetwork::new(3, &[&[0], &[1, 2]], ConfirmPolicy::fixed(2));
        let (a, b) = (&net.nodes[0], &net.nodes[1]);
        let genesis = a.devnet.genesis();
        let d = &a.devnet.delegates;

        let a1 = a.devnet.forge_empty(&genesis, d[0]);
        assert_eq!(a.pool.add_block(a1.clone()).unwrap(), AddOutcome::Adopted);

        let b1 = b.devnet.forge_empty(&genesis, d[1]);
        let b2 = b.devnet.forge_empty(&b1, d[2]);
        b.pool.add_block(b1.clone()).unwrap();
        b.pool.add_block(b2.clone()).unwrap();

        // heal
        a.pool.add_block(b1).unwrap();
        assert_eq!(a.pool.add_block(b2.clone()).unwrap(), AddOutcome::Adopted);
        assert_eq!(b.pool.add_block(a1).unwrap(), AddOutcome::Pooled);

        assert!(net.converged());
        assert_eq!(a.pool.preferred_tip(), b2);
        assert_eq!(a.pool.fork_tips().len(), 2);
    }

    #[test]
    fn test_tie_break_ignores_delivery_order() {
        let net = TestNetwork::new(3, &[&[0, 1, 2], &[0, 1, 2]], ConfirmPolicy::fixed(2));
        let (a, b) = (&net.nodes[0], &net.nodes[1]);
        let genesis = a.devnet.genesis();
        let order = by_first_slot(a, 2);

        let early = a.devnet.forge_empty(&genesis, order[0]);
        let late = a.devnet.forge_empty(&genesis, order[1]);
        assert!(early.timestamp < late.timestamp);

        a.pool.add_block(early.clone()).unwrap();
        a.pool.add_block(late.clone()).unwrap();
        b.pool.add_block(late).unwrap();
        assert_eq!(b.pool.add_block(early.clone()).unwrap(), AddOutcome::Adopted);

        assert!(net.converged());
        assert_eq!(b.pool.preferred_tip(), early);
    }

    // =============================================================================
    // ADMISSION
    // =============================================================================

    #[test]
    fn test_orphan_accepted_after_parent() {
        let node = TestNode::new(3, &[], ConfirmPolicy::fixed(2));
        let genesis = node.devnet.genesis();
        let d = &node.devnet.delegates;
        let parent = node.devnet.forge_empty(&genesis, d[0]);
        let child = node.devnet.forge_empty(&parent, d[1]);

        let err = node.pool.add_block(child.clone()).unwrap_err();
        assert!(err.is_orphan());
        assert_eq!(node.pool.pooled_count(), 0);

        assert_eq!(node.pool.add_block(parent).unwrap(), AddOutcome::Adopted);
        assert_eq!(node.pool.add_block(child.clone()).unwrap(), AddOutcome::Adopted);
        assert_eq!(
            node.pool.add_block(child).unwrap(),
            AddOutcome::Duplicate
        );
        assert_eq!(node.pool.pooled_count(), 2);
    }

    #[test]
    fn test_tampered_block_rejected() {
        let node = TestNode::new(3, &[], ConfirmPolicy::fixed(2));
        let genesis = node.devnet.genesis();
        let mut block: Block = node.devnet.forge_empty(&genesis, node.devnet.delegates[0]);
        block.transactions[0].amount += 1;

        let err = node.pool.add_block(block).unwrap_err();
        assert!(matches!(err, ForkPoolError::Verification { .. }));
        assert_eq!(node.pool.pooled_count(), 0);
        assert_eq!(node.pool.preferred_tip(), genesis);
    }

    // =============================================================================
    // FINALITY
    // =============================================================================

    #[test]
    fn test_finality_frees_losing_branch_transactions() {
        let node = TestNode::new(3, &[0, 1, 2], ConfirmPolicy::fixed(1));
        let genesis = node.devnet.genesis();
        let order = by_first_slot(&node, 3);
        let tx = node.devnet.transfer(0, 1, 100, 1_000);
        node.mempool.offer(tx.clone()).unwrap();

        let winner = node.devnet.forge_empty(&genesis, order[0]);
        let loser = node.devnet.forge(
            &genesis,
            order[1],
            vec![tx.clone()],
            &node.devnet.ledger.snapshot(),
        );
        node.pool.add_block(winner.clone()).unwrap();
        node.pool.add_block(loser).unwrap();
        assert!(node.pool.is_tx_pending(&tx.hash()));

        let next = node.devnet.forge_empty(&winner, order[2]);
        assert_eq!(node.pool.add_block(next.clone()).unwrap(), AddOutcome::Adopted);

        let finals = node.pool.advance_irreversible().unwrap();
        assert_eq!(finals, vec![winner]);
        assert_eq!(node.ledger_height(), 1);
        assert_eq!(node.pool.pooled_count(), 1);
        assert!(!node.pool.is_tx_pending(&tx.hash()));
        assert!(!node.devnet.ledger.snapshot().is_tx_confirmed(&tx.hash()));

        let candidate = node.producer.build_candidate();
        assert_eq!(candidate.prev_hash(), next.hash());
        assert!(candidate.block.tx_hashes().any(|h| h == tx.hash()));
    }
}
