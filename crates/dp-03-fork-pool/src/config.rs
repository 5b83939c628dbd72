//! Configuration for the fork pool

use serde::Deserialize;

/// Heights above the canonical tip past which fork resolution stops expanding.
pub const DEFAULT_SAFETY_DISTANCE: u64 = 500;

/// Distinct producers that make a block final on main networks.
pub const DEFAULT_CONFIRM_THRESHOLD: usize = 8;

/// Fork pool parameters
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ForkPoolConfig {
    pub safety_distance: u64,

    pub confirm: ConfirmPolicy,
}

impl Default for ForkPoolConfig {
    fn default() -> Self {
        Self {
            safety_distance: DEFAULT_SAFETY_DISTANCE,
            confirm: ConfirmPolicy::default(),
        }
    }
}

/// How many distinct producers finalize a block, by network phase.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConfirmPolicy {
    /// Threshold once the network is past bootstrap
    pub threshold: usize,

    /// Threshold while the preferred tip is below `bootstrap_end_height`
    pub bootstrap_threshold: usize,

    /// End of the bootstrap window; `None` disables it
    pub bootstrap_end_height: Option<u64>,
}

impl Default for ConfirmPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CONFIRM_THRESHOLD,
            bootstrap_threshold: 1,
            bootstrap_end_height: None,
        }
    }
}

impl ConfirmPolicy {
    /// Fixed threshold with no bootstrap window.
    pub fn fixed(threshold: usize) -> Self {
        Self {
            threshold,
            bootstrap_threshold: threshold,
            bootstrap_end_height: None,
        }
    }

    /// Threshold in force when the preferred tip is at `tip_height`.
    pub fn threshold_at(&self, tip_height: u64) -> usize {
        let threshold = match self.bootstrap_end_height {
            Some(end) if tip_height < end => self.bootstrap_threshold,
            _ => self.threshold,
        };
        threshold.max(1)
    }
}
