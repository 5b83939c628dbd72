//! # DPoS Core Test Suite
//!
//! Cross-subsystem flows over several in-memory nodes.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/
//! │   ├── fixtures.rs       # TestNode / TestNetwork
//! │   └── integration/
//! │       ├── fork_resolution.rs
//! │       └── production_flow.rs
//! └── benches/              # Fork pool and packing throughput
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p dp-tests
//! cargo test -p dp-tests integration::fork_resolution
//! cargo bench -p dp-tests
//! ```

pub mod fixtures;
pub mod integration;
