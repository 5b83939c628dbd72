//! # Fork Pool Metrics
//!
//! Enable with the `metrics` feature.
//!
//! - `dpos_fork_pool_blocks` - blocks currently pooled
//! - `dpos_fork_pool_added_total` - add attempts, by outcome
//! - `dpos_irreversible_blocks_total` - blocks committed as final
//! - `dpos_consensus_failures_total` - pool resets

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter,
    IntCounterVec, IntGauge,
};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref POOLED_BLOCKS: IntGauge = register_int_gauge!(
        "dpos_fork_pool_blocks",
        "Number of blocks held in the fork pool"
    )
    .expect("Failed to create POOLED_BLOCKS metric");

    pub static ref BLOCKS_ADDED: IntCounterVec = register_int_counter_vec!(
        "dpos_fork_pool_added_total",
        "Blocks offered to the fork pool, by outcome",
        &["outcome"]
    )
    .expect("Failed to create BLOCKS_ADDED metric");

    pub static ref IRREVERSIBLE_BLOCKS: IntCounter = register_int_counter!(
        "dpos_irreversible_blocks_total",
        "Blocks committed to the canonical chain as irreversible"
    )
    .expect("Failed to create IRREVERSIBLE_BLOCKS metric");

    pub static ref CONSENSUS_FAILURES: IntCounter = register_int_counter!(
        "dpos_consensus_failures_total",
        "Fork pool resets after a consensus failure"
    )
    .expect("Failed to create CONSENSUS_FAILURES metric");
}

#[cfg(feature = "metrics")]
pub fn set_pooled_blocks(count: usize) {
    POOLED_BLOCKS.set(count as i64);
}

#[cfg(feature = "metrics")]
pub fn record_add(outcome: &str) {
    BLOCKS_ADDED.with_label_values(&[outcome]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_irreversible(count: usize) {
    IRREVERSIBLE_BLOCKS.inc_by(count as u64);
}

#[cfg(feature = "metrics")]
pub fn record_consensus_failure() {
    CONSENSUS_FAILURES.inc();
}

#[cfg(not(feature = "metrics"))]
pub fn set_pooled_blocks(_count: usize) {}

#[cfg(not(feature = "metrics"))]
pub fn record_add(_outcome: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_irreversible(_count: usize) {}

#[cfg(not(feature = "metrics"))]
pub fn record_consensus_failure() {}
