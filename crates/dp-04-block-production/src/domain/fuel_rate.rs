//! Fuel-rate adjustment over a trailing window of blocks.
//!
//! The rate moves 10% per block toward keeping average run-step usage inside
//! a utilization band of the per-block ceiling. Pure: the caller supplies the
//! window.

use crate::config::FuelRateConfig;
use shared_types::{Block, STEPS_PER_FUEL_UNIT};
use tracing::debug;

/// Run steps a block paid for, recovered from its fuel and rate.
pub fn block_run_steps(block: &Block) -> u64 {
    block.fuel / block.fuel_rate.max(1) * STEPS_PER_FUEL_UNIT
}

pub struct FuelRateAdjuster {
    config: FuelRateConfig,
    max_block_run_steps: u64,
}

impl FuelRateAdjuster {
    pub fn new(config: FuelRateConfig, max_block_run_steps: u64) -> Self {
        Self {
            config,
            max_block_run_steps,
        }
    }

    /// Blocks the caller should gather for [`FuelRateAdjuster::next_rate`].
    pub fn window(&self) -> usize {
        self.config.window
    }

    /// Rate for the block built on `predecessor`.
    ///
    /// `window` holds the trailing blocks newest first, starting with
    /// `predecessor`.
    pub fn next_rate(&self, predecessor: &Block, window: &[Block]) -> u64 {
        let cfg = &self.config;
        if (cfg.window as u64).saturating_mul(2) >= predecessor.height.saturating_sub(1) {
            return cfg.initial_rate;
        }

        let base = predecessor.fuel_rate;
        let sampled = &window[..window.len().min(cfg.window)];
        if sampled.is_empty() {
            return base.max(cfg.min_rate);
        }

        let total: u64 = sampled.iter().map(block_run_steps).sum();
        let average = total / sampled.len() as u64;
        let low = self.max_block_run_steps / 100 * cfg.low_utilization_pct;
        let high = self.max_block_run_steps / 100 * cfg.high_utilization_pct;

        let rate = if average < low {
            base / 10 * 9 + base % 10 * 9 / 10
        } else if average > high {
            // Truncating 10% of a small rate would never move it.
            base.saturating_add((base / 10).max(1))
        } else {
            base
        };
        let rate = rate.max(cfg.min_rate);

        debug!(
            "[dp-04] Fuel rate {} -> {} at height {} (average {} steps over {} blocks)",
            base,
            rate,
            predecessor.height + 1,
            average,
            sampled.len()
        );
        rate
    }
}
