//! # DPoS Core Benchmarks
//!
//! | Subsystem | Operation | Target |
//! |-----------|-----------|--------|
//! | dp-01 Delegate Schedule | round shuffle of 101 delegates | < 50µs |
//! | dp-03 Fork Pool | leaf resolution + preference over wide trees | < 1ms |
//! | dp-03 Fork Pool | irreversibility walk over 500 blocks | < 1ms |
//! | dp-04 Block Production | candidate from a 500-transaction mempool | < 1s (slot budget) |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dp_01_delegate_schedule::shuffle_delegates;
use dp_03_fork_pool::domain::{determine_irreversible, resolve_leaves, select_preferred};
use dp_03_fork_pool::ConfirmPolicy;
use dp_tests::fixtures::TestNode;
use shared_types::{AccountId, Block, Hash, Mempool, Transaction, ZERO_HASH};
use std::collections::HashMap;
use std::time::Duration;

const CANONICAL: Hash = [7; 32];

fn block(parent: Hash, height: u64, producer: u16, salt: u64) -> Block {
    Block {
        version: Block::CURRENT_VERSION,
        height,
        prev_hash: parent,
        timestamp: height * 10 + salt,
        nonce: 0,
        fuel: 0,
        fuel_rate: 100,
        merkle_root: ZERO_HASH,
        signature: Vec::new(),
        transactions: vec![Transaction::reward(AccountId::new(0, producer), height, 0)],
    }
}

/// `branches` forks off the canonical tip, each `depth` blocks long.
fn forest(branches: u64, depth: u64) -> HashMap<Hash, Block> {
    let mut blocks = HashMap::new();
    for b in 0..branches {
        let mut parent = CANONICAL;
        for h in 1..=depth {
            let next = block(parent, 100 + h, (h % 21) as u16 + 1, b);
            parent = next.hash();
            blocks.insert(parent, next);
        }
    }
    blocks
}

// ============================================================================
// DP-01: Delegate Schedule
// ============================================================================

fn bench_round_shuffle(c: &mut Criterion) {
    let mut group = c.benchmark_group("dp-01-delegate-schedule");
    let delegates: Vec<AccountId> = (1..=101).map(|i| AccountId::new(0, i)).collect();

    group.bench_function("shuffle_101", |b| {
        b.iter(|| {
            let mut round = delegates.clone();
            shuffle_delegates(black_box(1_010), &mut round);
            round
        })
    });
    group.finish();
}

// ============================================================================
// DP-03: Fork Pool
// ============================================================================

fn bench_fork_choice(c: &mut Criterion) {
    let mut group = c.benchmark_group("dp-03-fork-choice");

    for branches in [1u64, 8, 32] {
        let blocks = forest(branches, 50);
        group.throughput(Throughput::Elements(blocks.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("resolve_and_select", branches),
            &blocks,
            |b, blocks| {
                b.iter(|| {
                    let leaves = resolve_leaves(&[CANONICAL], blocks, 100, 500);
                    select_preferred(&leaves, blocks).map(|tip| tip.height)
                })
            },
        );
    }
    group.finish();
}

fn bench_irreversibility(c: &mut Criterion) {
    let mut group = c.benchmark_group("dp-03-irreversibility");
    let blocks = forest(1, 500);
    let tip = blocks
        .values()
        .max_by_key(|b| b.height)
        .cloned()
        .expect("non-empty chain");

    for threshold in [8usize, 15] {
        group.bench_with_input(
            BenchmarkId::new("walk_500", threshold),
            &threshold,
            |b, threshold| {
                b.iter(|| determine_irreversible(&tip, &blocks, &CANONICAL, *threshold).len())
            },
        );
    }
    group.finish();
}

// ============================================================================
// DP-04: Block Production
// ============================================================================

fn bench_candidate_building(c: &mut Criterion) {
    let mut group = c.benchmark_group("dp-04-block-production");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(20);

    for size in [50usize, 500] {
        let node = TestNode::new(3, &[0, 1, 2], ConfirmPolicy::fixed(2));
        for i in 0..size {
            let tx = if i % 4 == 0 {
                node.devnet.contract_call(i % 4, 200, 5_000)
            } else {
                node.devnet.transfer(i % 4, (i + 1) % 4, 10, 1_000 + i as u64)
            };
            node.mempool.offer(tx).expect("funded devnet transaction");
        }

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("build_candidate", size), &node, |b, node| {
            b.iter(|| node.producer.build_candidate().tx_count())
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_round_shuffle,
    bench_fork_choice,
    bench_irreversibility,
    bench_candidate_building
);
criterion_main!(benches);
