//! Configuration for the delegate schedule

use serde::Deserialize;

/// Number of delegates in the active set on main networks.
pub const DEFAULT_TOTAL_DELEGATES: usize = 11;

/// Seconds per slot before any interval fork.
pub const DEFAULT_BLOCK_INTERVAL_SECS: u64 = 10;

/// Schedule parameters
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Size of the active delegate set (`N`)
    pub total_delegates: usize,

    /// Slot length in seconds
    pub block_interval_secs: u64,

    /// Optional height at which the slot length changes
    pub interval_fork: Option<IntervalFork>,
}

/// A slot-length change activated at a fixed height
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct IntervalFork {
    pub height: u64,
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            total_delegates: DEFAULT_TOTAL_DELEGATES,
            block_interval_secs: DEFAULT_BLOCK_INTERVAL_SECS,
            interval_fork: None,
        }
    }
}

impl ScheduleConfig {
    /// Slot length in force at `height`.
    pub fn block_interval(&self, height: u64) -> u64 {
        match self.interval_fork {
            Some(fork) if height >= fork.height => fork.interval_secs,
            _ => self.block_interval_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_switches_at_fork_height() {
        let config = ScheduleConfig {
            interval_fork: Some(IntervalFork {
                height: 100,
                interval_secs: 3,
            }),
            ..Default::default()
        };
        assert_eq!(config.block_interval(99), 10);
        assert_eq!(config.block_interval(100), 3);
    }
}
