//! Ed25519 block signing and verification.

use crate::entities::{Hash, PublicKey};
use crate::ports::BlockSigner;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Ed25519 keyring holding the delegate keys this node may sign with.
#[derive(Default)]
pub struct Ed25519Keyring {
    keys: RwLock<HashMap<PublicKey, SigningKey>>,
}

impl Ed25519Keyring {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seeds(seeds: &[[u8; 32]]) -> Self {
        let keyring = Self::new();
        for seed in seeds {
            keyring.insert_seed(*seed);
        }
        keyring
    }

    /// Adds the key derived from `seed`, returning its public key.
    pub fn insert_seed(&self, seed: [u8; 32]) -> PublicKey {
        let key = SigningKey::from_bytes(&seed);
        let pubkey = key.verifying_key().to_bytes();
        self.keys.write().insert(pubkey, key);
        pubkey
    }

    /// Public key derived from `seed`, without holding it.
    pub fn public_key_for_seed(seed: &[u8; 32]) -> PublicKey {
        SigningKey::from_bytes(seed).verifying_key().to_bytes()
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}

impl BlockSigner for Ed25519Keyring {
    fn has_key(&self, pubkey: &PublicKey) -> bool {
        self.keys.read().contains_key(pubkey)
    }

    fn has_any_key(&self) -> bool {
        !self.is_empty()
    }

    fn sign(&self, pubkey: &PublicKey, hash: &Hash) -> Option<Vec<u8>> {
        let keys = self.keys.read();
        let key = keys.get(pubkey)?;
        Some(key.sign(hash).to_bytes().to_vec())
    }

    fn verify(&self, hash: &Hash, signature: &[u8], pubkey: &PublicKey) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(pubkey) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        verifying_key.verify(hash, &signature).is_ok()
    }
}
