//! # DPoS Node Runtime
//!
//! Wires the delegate schedule (dp-01), block verifier (dp-02), fork pool
//! (dp-03) and block producer (dp-04) over the in-memory ledger, mempool and
//! keyring, and drives finality on a timer.
//!
//! Configuration comes from [`config::load_config`]; see that module for the
//! `DP_*` environment variables.

pub mod config;
pub mod error;
pub mod genesis;
pub mod runtime;

pub use config::{load_config, NodeConfig, RuntimeConfig};
pub use error::{Result, RuntimeError};
pub use runtime::NodeRuntime;
