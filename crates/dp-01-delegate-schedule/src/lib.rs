//! # Delegate Schedule Subsystem (dp-01)
//!
//! Maps a block height and timestamp to the delegate entitled to produce it.
//!
//! ## Rules
//!
//! - The active set is the top `N` delegates of the vote tally.
//! - Every round of `N` blocks shares one deterministic shuffle, seeded by a
//!   hash chain keyed on the round number.
//! - `slot = timestamp / block_interval(height)`; the expected producer is
//!   the shuffled list at `slot mod N`.

pub mod config;
pub mod error;
pub mod schedule;
pub mod shuffle;

pub use config::{IntervalFork, ScheduleConfig};
pub use error::{Result, ScheduleError};
pub use schedule::DelegateSchedule;
pub use shuffle::{round_number, round_seed, shuffle_delegates};
