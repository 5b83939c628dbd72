//! # In-Memory Adapters
//!
//! Reference implementations of the collaborator ports. The node runtime
//! wires them for devnet use and every test suite uses them as fixtures.

mod clock;
mod ledger;
mod mempool;
mod signer;
mod snapshot;

pub use clock::{ManualClock, StaticPeers, SystemTimeSource};
pub use ledger::{GenesisState, MemoryLedger};
pub use mempool::MemoryMempool;
pub use signer::Ed25519Keyring;
pub use snapshot::MemorySnapshot;
