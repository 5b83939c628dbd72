//! # Shared Types Crate
//!
//! Chain entities and collaborator ports shared by the delegate schedule,
//! block verifier, fork pool and block producer.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: `Block`, `Transaction` and `Account` are
//!   defined once here; subsystems never redefine them.
//! - **Narrow Collaborators**: the ledger store, ledger snapshot, mempool and
//!   signer are consumed only through the traits in [`ports`].
//! - **Immutable Blocks**: a block's hash is a pure function of its
//!   contents; nothing mutates a block after it is sealed.

pub mod entities;
pub mod errors;
pub mod hashing;
pub mod in_memory;
pub mod ports;

pub use entities::*;
pub use errors::*;
pub use hashing::{merkle_root, sha256, short_hex};
pub use ports::*;
