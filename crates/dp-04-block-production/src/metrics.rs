//! # Block Production Metrics
//!
//! Enable with the `metrics` feature.
//!
//! - `dpos_blocks_produced_total` - blocks produced and accepted by the fork pool
//! - `dpos_production_failures_total` - abandoned attempts, by reason
//! - `dpos_packed_transactions` - transactions in the last produced block
//! - `dpos_fuel_rate` - fuel rate of the last candidate

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter,
    IntCounterVec, IntGauge,
};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref BLOCKS_PRODUCED: IntCounter = register_int_counter!(
        "dpos_blocks_produced_total",
        "Blocks produced by this node and accepted by the fork pool"
    )
    .expect("Failed to create BLOCKS_PRODUCED metric");

    pub static ref PRODUCTION_FAILURES: IntCounterVec = register_int_counter_vec!(
        "dpos_production_failures_total",
        "Abandoned production attempts, by reason",
        &["reason"]
    )
    .expect("Failed to create PRODUCTION_FAILURES metric");

    pub static ref PACKED_TRANSACTIONS: IntGauge = register_int_gauge!(
        "dpos_packed_transactions",
        "Transactions in the last produced block"
    )
    .expect("Failed to create PACKED_TRANSACTIONS metric");

    pub static ref FUEL_RATE: IntGauge = register_int_gauge!(
        "dpos_fuel_rate",
        "Fuel rate of the last block candidate"
    )
    .expect("Failed to create FUEL_RATE metric");
}

#[cfg(feature = "metrics")]
pub fn record_block_produced(tx_count: usize) {
    BLOCKS_PRODUCED.inc();
    PACKED_TRANSACTIONS.set(tx_count as i64);
}

#[cfg(feature = "metrics")]
pub fn record_attempt_failed(reason: &str) {
    PRODUCTION_FAILURES.with_label_values(&[reason]).inc();
}

#[cfg(feature = "metrics")]
pub fn set_fuel_rate(rate: u64) {
    FUEL_RATE.set(rate as i64);
}

#[cfg(not(feature = "metrics"))]
pub fn record_block_produced(_tx_count: usize) {}

#[cfg(not(feature = "metrics"))]
pub fn record_attempt_failed(_reason: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn set_fuel_rate(_rate: u64) {}
