//! # Integration Tests
//!
//! Multi-node flows through the fork pool and block producer.

pub mod fork_resolution;
pub mod production_flow;
