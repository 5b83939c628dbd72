//! # Round Shuffle
//!
//! Deterministic permutation of the active delegate set, stable for the
//! `N` heights of one round.
//!
//! The seed starts as `sha256(round)` over the round number's decimal form.
//! Each group of up to four swaps consumes the seed's four 8-byte windows
//! (little-endian, reduced modulo `N`), then the seed is rehashed.

use sha2::{Digest, Sha256};
use shared_types::{AccountId, Hash};

/// Swaps driven by one seed.
const SWAPS_PER_SEED: usize = 4;

/// Round containing `height`: `ceil(height / n)`.
pub fn round_number(height: u64, n: usize) -> u64 {
    let n = n.max(1) as u64;
    height.div_ceil(n)
}

/// Initial seed of a round.
pub fn round_seed(round: u64) -> Hash {
    Sha256::digest(round.to_string().as_bytes()).into()
}

/// Shuffles `delegates` in place for the round containing `height`.
pub fn shuffle_delegates(height: u64, delegates: &mut [AccountId]) {
    let n = delegates.len();
    if n < 2 {
        return;
    }

    let mut seed = round_seed(round_number(height, n));
    let mut i = 0;
    while i < n {
        for window in seed.chunks_exact(8).take(SWAPS_PER_SEED) {
            if i >= n {
                break;
            }
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(window);
            let j = (u64::from_le_bytes(bytes) % n as u64) as usize;
            delegates.swap(i, j);
            i += 1;
        }
        seed = Sha256::digest(seed).into();
    }
}
