//! Pure fork-pool logic: reference counting, fork choice, irreversibility.

pub mod fork_choice;
pub mod irreversibility;
pub mod pending;

pub use fork_choice::{compare_tips, descendants_of, is_better, resolve_leaves, select_preferred};
pub use irreversibility::determine_irreversible;
pub use pending::PendingIndex;
