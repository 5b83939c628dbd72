//! # Fork Pool Subsystem (dp-03)
//!
//! Holds verified blocks that are not yet on the canonical chain, decides
//! which branch tip is preferred and when blocks become irreversible.
//!
//! ## Invariants
//!
//! - Every pooled block's ancestry reaches the canonical tip through pooled
//!   blocks when it is admitted; orphans are rejected, never inserted.
//! - Exactly one preferred tip exists; the canonical tip when the pool is empty.
//! - A transaction's pending count equals the number of pooled blocks
//!   containing it.
//! - Once a height is reported final and committed, no pooled block at or
//!   below it survives, so fork choice cannot resurrect a competitor.
//!
//! ## Concurrency
//!
//! All state sits behind one non-reentrant lock held for the full duration of
//! each public operation, serializing block admission against production.

pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod service;
pub mod state;

pub use config::{ConfirmPolicy, ForkPoolConfig};
pub use error::{ForkPoolError, Result};
pub use service::{AddOutcome, ForkPool, ForkPoolDependencies, ResubmitReport};
