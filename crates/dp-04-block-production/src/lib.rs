//! # Block Production Subsystem (dp-04)
//!
//! Builds blocks on the fork pool's preferred tip and submits them in the
//! node's own delegate slots.
//!
//! ## Pipeline
//!
//! 1. Fuel rate from the trailing window of the preferred branch.
//! 2. Mempool candidates ranked by priority, then net fee per kilobyte.
//! 3. Greedy packing with trial execution under the size, run-step and
//!    slot-time ceilings; a reward transaction collects `fees - fuel`.
//! 4. Sealing at slot time for the scheduled delegate, if its key is held.
//! 5. Submission through the fork pool, which runs the block verifier.
//!
//! ## Cancellation
//!
//! An attempt is abandoned when the preferred tip moves, the mempool update
//! counter changes, peers disconnect (unless solo mining), or the attempt
//! timeout elapses. The loop then starts over with a fresh candidate.

pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod service;

pub use config::{BlockProductionConfig, FuelRateConfig, MiningConfig};
pub use domain::{BlockCandidate, MinedBlockInfo};
pub use error::{BlockProductionError, Result};
pub use service::{AttemptOutcome, BlockProducer, ProducerDependencies, ProducerStatus};
