//! Configuration types for block production

use crate::error::{BlockProductionError, Result};
use serde::Deserialize;
use shared_types::INITIAL_FUEL_RATE;

/// Default ceiling on the serialized size of a produced block.
pub const DEFAULT_MAX_BLOCK_SIZE: u64 = 1_000_000;

/// Smallest block size ceiling the producer accepts.
pub const MIN_BLOCK_SIZE: u64 = 1_000;

/// Fixed-point scale of median prices.
pub const PRICE_BOOST: u64 = 10_000;

/// Runtime configuration for block production
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BlockProductionConfig {
    /// Largest block this node is willing to produce, clamped against the
    /// verifier's hard limit
    pub max_block_size: u64,

    /// Scale of `median_price` values
    pub price_boost: u64,

    pub fuel_rate: FuelRateConfig,

    pub mining: MiningConfig,
}

impl Default for BlockProductionConfig {
    fn default() -> Self {
        Self {
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
            price_boost: PRICE_BOOST,
            fuel_rate: FuelRateConfig::default(),
            mining: MiningConfig::default(),
        }
    }
}

impl BlockProductionConfig {
    /// Size ceiling kept between 1 KB and 1 KB under the hard limit.
    pub fn effective_max_block_size(&self, hard_limit: u64) -> u64 {
        let upper = hard_limit.saturating_sub(MIN_BLOCK_SIZE).max(MIN_BLOCK_SIZE);
        self.max_block_size.clamp(MIN_BLOCK_SIZE, upper)
    }

    pub fn validate(&self) -> Result<()> {
        if self.price_boost == 0 {
            return Err(BlockProductionError::InvalidConfig(
                "price_boost must be positive".into(),
            ));
        }
        self.fuel_rate.validate()?;
        self.mining.validate()
    }
}

/// Trailing-window fuel-rate adjustment
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FuelRateConfig {
    /// Blocks averaged per adjustment
    pub window: usize,

    /// Rate used until the chain is longer than twice the window
    pub initial_rate: u64,

    /// Below this share of the run-step ceiling the rate drops 10%
    pub low_utilization_pct: u64,

    /// Above this share of the run-step ceiling the rate rises 10%
    pub high_utilization_pct: u64,

    pub min_rate: u64,
}

impl Default for FuelRateConfig {
    fn default() -> Self {
        Self {
            window: 50,
            initial_rate: INITIAL_FUEL_RATE,
            low_utilization_pct: 75,
            high_utilization_pct: 85,
            min_rate: 1,
        }
    }
}

impl FuelRateConfig {
    fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(BlockProductionError::InvalidConfig(
                "fuel_rate.window must be positive".into(),
            ));
        }
        if self.low_utilization_pct > self.high_utilization_pct {
            return Err(BlockProductionError::InvalidConfig(format!(
                "fuel_rate band inverted: low {}% > high {}%",
                self.low_utilization_pct, self.high_utilization_pct
            )));
        }
        if self.min_rate == 0 || self.initial_rate < self.min_rate {
            return Err(BlockProductionError::InvalidConfig(
                "fuel_rate.initial_rate must be at least min_rate, which must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Mining loop behaviour
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MiningConfig {
    /// An attempt on one candidate is abandoned after this long
    pub attempt_timeout_secs: u64,

    /// Sleep between wake-ups of the mining loop
    pub poll_interval_ms: u64,

    /// Mine without connected peers (regtest)
    pub allow_solo: bool,

    /// Preferred tip age beyond which mining pauses
    pub stale_tip_secs: u64,

    /// Mine on a stale tip anyway
    pub force: bool,

    /// Stop after producing this many blocks past the start height.
    /// `None` mines until stopped.
    pub target_height: Option<u64>,

    /// Mined blocks remembered for status queries
    pub history_capacity: usize,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_secs: 60,
            poll_interval_ms: 100,
            allow_solo: false,
            stale_tip_secs: 60 * 60,
            force: false,
            target_height: None,
            history_capacity: 100,
        }
    }
}

impl MiningConfig {
    fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(BlockProductionError::InvalidConfig(
                "mining.poll_interval_ms must be positive".into(),
            ));
        }
        if self.history_capacity == 0 {
            return Err(BlockProductionError::InvalidConfig(
                "mining.history_capacity must be positive".into(),
            ));
        }
        if matches!(self.target_height, Some(0)) {
            return Err(BlockProductionError::InvalidConfig(
                "mining.target_height must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(BlockProductionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_block_size_clamped() {
        let mut config = BlockProductionConfig::default();
        assert_eq!(config.effective_max_block_size(4_000_000), 1_000_000);

        config.max_block_size = 10;
        assert_eq!(config.effective_max_block_size(4_000_000), MIN_BLOCK_SIZE);

        config.max_block_size = 5_000_000;
        assert_eq!(config.effective_max_block_size(4_000_000), 3_999_000);
    }

    #[test]
    fn test_inverted_band_rejected() {
        let config = BlockProductionConfig {
            fuel_rate: FuelRateConfig {
                low_utilization_pct: 90,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(BlockProductionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_target_height_rejected() {
        let config = BlockProductionConfig {
            mining: MiningConfig {
                target_height: Some(0),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
