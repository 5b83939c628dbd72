//! # Hashing Helpers
//!
//! SHA-256 digests, the transaction merkle tree and log formatting.

use crate::entities::{Hash, ZERO_HASH};
use sha2::{Digest, Sha256};

/// SHA-256 of an arbitrary byte string.
pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

/// Merkle root over a list of leaf hashes.
///
/// Odd levels duplicate their last node. An empty list yields the zero hash.
pub fn merkle_root(leaves: &[Hash]) -> Hash {
    if leaves.is_empty() {
        return ZERO_HASH;
    }

    let mut level: Vec<Hash> = leaves.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let left = pair[0];
                let right = pair.get(1).copied().unwrap_or(left);
                let mut hasher = Sha256::new();
                hasher.update(left);
                hasher.update(right);
                hasher.finalize().into()
            })
            .collect();
    }
    level[0]
}

/// First eight bytes of a hash as hex, for log lines.
pub fn short_hex(hash: &Hash) -> String {
    hex::encode(&hash[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merkle_root_empty() {
        assert_eq!(merkle_root(&[]), ZERO_HASH);
    }

    #[test]
    fn test_merkle_root_single_leaf_is_leaf() {
        let leaf = sha256(b"leaf");
        assert_eq!(merkle_root(&[leaf]), leaf);
    }

    #[test]
    fn test_merkle_root_odd_duplicates_last() {
        let a = sha256(b"a");
        let b = sha256(b"b");
        let c = sha256(b"c");
        assert_eq!(merkle_root(&[a, b, c]), merkle_root(&[a, b, c, c]));
    }

    #[test]
    fn test_merkle_root_order_sensitive() {
        let a = sha256(b"a");
        let b = sha256(b"b");
        assert_ne!(merkle_root(&[a, b]), merkle_root(&[b, a]));
    }

    #[test]
    fn test_short_hex_length() {
        assert_eq!(short_hex(&[0xAB; 32]), "abababababababab");
    }
}
