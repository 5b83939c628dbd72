//! # Delegate Schedule
//!
//! Resolves the expected producer of a block from the vote tally, the round
//! shuffle and the slot derived from the block timestamp.

use crate::config::ScheduleConfig;
use crate::error::{Result, ScheduleError};
use crate::shuffle::{round_number, shuffle_delegates};
use parking_lot::Mutex;
use shared_types::{AccountId, DelegateSource};
use tracing::trace;

/// Last computed shuffle, keyed on round and the unshuffled active set.
struct CachedRound {
    round: u64,
    active: Vec<AccountId>,
    shuffled: Vec<AccountId>,
}

/// Slot-to-delegate mapping.
pub struct DelegateSchedule {
    config: ScheduleConfig,
    cache: Mutex<Option<CachedRound>>,
}

impl DelegateSchedule {
    pub fn new(config: ScheduleConfig) -> Result<Self> {
        if config.total_delegates == 0 {
            return Err(ScheduleError::EmptyDelegateSet);
        }
        if config.block_interval_secs == 0 {
            return Err(ScheduleError::ZeroInterval(0));
        }
        if let Some(fork) = config.interval_fork {
            if fork.interval_secs == 0 {
                return Err(ScheduleError::ZeroInterval(fork.height));
            }
        }
        Ok(Self {
            config,
            cache: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Size of the active set.
    pub fn total_delegates(&self) -> usize {
        self.config.total_delegates
    }

    /// Slot length at `height`.
    pub fn block_interval(&self, height: u64) -> u64 {
        self.config.block_interval(height)
    }

    /// Slot number of `timestamp` at `height`.
    pub fn slot(&self, height: u64, timestamp: u64) -> u64 {
        timestamp / self.block_interval(height).max(1)
    }

    /// Shuffled active set for the round containing `height`.
    pub fn shuffled_for(
        &self,
        height: u64,
        source: &impl DelegateSource,
    ) -> Result<Vec<AccountId>> {
        let n = self.config.total_delegates;
        let mut active = source.top_delegates()?;
        if active.len() < n {
            return Err(ScheduleError::NotEnoughDelegates {
                needed: n,
                available: active.len(),
            });
        }
        active.truncate(n);

        let round = round_number(height, n);
        let mut cache = self.cache.lock();
        if let Some(cached) = cache.as_ref() {
            if cached.round == round && cached.active == active {
                return Ok(cached.shuffled.clone());
            }
        }

        let mut shuffled = active.clone();
        shuffle_delegates(height, &mut shuffled);
        trace!("[dp-01] Round {} shuffle computed for {} delegates", round, n);
        *cache = Some(CachedRound {
            round,
            active,
            shuffled: shuffled.clone(),
        });
        Ok(shuffled)
    }

    /// Delegate entitled to produce the block at `height` stamped `timestamp`.
    pub fn expected_producer(
        &self,
        height: u64,
        timestamp: u64,
        source: &impl DelegateSource,
    ) -> Result<AccountId> {
        let shuffled = self.shuffled_for(height, source)?;
        let slot = self.slot(height, timestamp);
        let index = (slot % shuffled.len() as u64) as usize;
        Ok(shuffled[index])
    }

    /// Earliest timestamp a block on top of `prev_timestamp` may carry without
    /// tripping the double-production rule.
    pub fn next_slot_time(&self, height: u64, prev_timestamp: u64) -> u64 {
        prev_timestamp.saturating_add(self.block_interval(height))
    }
}
