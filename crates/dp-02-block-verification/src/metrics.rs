//! # Verification Metrics
//!
//! Enable with the `metrics` feature:
//! ```toml
//! dp-02-block-verification = { path = "...", features = ["metrics"] }
//! ```
//!
//! - `dpos_blocks_verified_total` - blocks accepted
//! - `dpos_blocks_rejected_total` - blocks rejected, by reason
//! - `dpos_verification_latency_seconds` - time spent per block

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{
    register_counter_vec, register_histogram, register_int_counter, CounterVec, Histogram,
    IntCounter,
};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref BLOCKS_VERIFIED: IntCounter = register_int_counter!(
        "dpos_blocks_verified_total",
        "Total number of blocks accepted by the verifier"
    )
    .expect("Failed to create BLOCKS_VERIFIED metric");

    pub static ref BLOCKS_REJECTED: CounterVec = register_counter_vec!(
        "dpos_blocks_rejected_total",
        "Total number of blocks rejected by the verifier",
        &["reason"]
    )
    .expect("Failed to create BLOCKS_REJECTED metric");

    pub static ref VERIFICATION_LATENCY: Histogram = register_histogram!(
        "dpos_verification_latency_seconds",
        "Time taken to verify a block in seconds",
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to create VERIFICATION_LATENCY metric");
}

#[cfg(feature = "metrics")]
pub fn record_block_verified() {
    BLOCKS_VERIFIED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_block_rejected(reason: &str) {
    BLOCKS_REJECTED.with_label_values(&[reason]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_verification_latency(seconds: f64) {
    VERIFICATION_LATENCY.observe(seconds);
}

#[cfg(not(feature = "metrics"))]
pub fn record_block_verified() {}

#[cfg(not(feature = "metrics"))]
pub fn record_block_rejected(_reason: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_verification_latency(_seconds: f64) {}
