//! Domain layer - pure block production logic
//!
//! No I/O and no async here; the service feeds these pieces ledger views,
//! mempool entries and the clock.
//!
//! - [`FuelRateAdjuster`]: trailing-window fuel rate
//! - [`prioritize`]: mempool candidate ordering
//! - [`TransactionPacker`]: greedy packing with trial execution
//! - [`BlockCandidate`] and [`seal`]: assembly and slot sealing
//! - [`MinedHistory`]: produced-block ring

pub mod assembler;
pub mod fuel_rate;
pub mod mined;
pub mod priority;
pub mod selection;

pub use assembler::{seal, signing_key, BlockCandidate, SealParams};
pub use fuel_rate::{block_run_steps, FuelRateAdjuster};
pub use mined::{MinedBlockInfo, MinedHistory};
pub use priority::{fee_per_kb, prioritize, TxPriority};
pub use selection::{PackedTransactions, PackingLimits, TransactionPacker};
