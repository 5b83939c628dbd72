//! # Devnet Genesis
//!
//! Deterministic genesis for a single-process network: delegate `i` is
//! account `0-(i+1)`, its key is derived from a fixed seed, and every
//! delegate starts funded. The node's keyring holds only the local
//! delegates' keys.

use crate::config::NodeConfig;
use shared_types::in_memory::{Ed25519Keyring, GenesisState};
use shared_types::{sha256, Account, AccountId, Block, FeeToken, INITIAL_FUEL_RATE, ZERO_HASH};
use std::collections::HashMap;

/// Median price of both fee tokens at genesis.
pub const GENESIS_PRICE: u64 = 10_000;

/// Key seed of devnet delegate `i`.
pub fn delegate_seed(i: usize) -> [u8; 32] {
    sha256(format!("dpos-devnet-delegate-{}", i).as_bytes())
}

/// Genesis block and ledger contents.
pub struct DevnetGenesis {
    pub block: Block,
    pub state: GenesisState,
    pub delegates: Vec<AccountId>,
}

/// Builds the devnet genesis from a [`NodeConfig`].
pub struct GenesisBuilder {
    total_delegates: usize,
    starting_balance: u64,
    timestamp: u64,
}

impl GenesisBuilder {
    /// `now` is used when the configuration leaves the genesis time open.
    pub fn new(config: &NodeConfig, now: u64) -> Self {
        Self {
            total_delegates: config.schedule.total_delegates,
            starting_balance: config.node.starting_balance,
            timestamp: config.node.genesis_time.unwrap_or(now),
        }
    }

    pub fn build(&self) -> DevnetGenesis {
        let delegates: Vec<AccountId> = (0..self.total_delegates)
            .map(|i| AccountId::new(0, i as u16 + 1))
            .collect();
        let accounts = delegates
            .iter()
            .enumerate()
            .map(|(i, id)| Account {
                id: *id,
                owner_pubkey: Ed25519Keyring::public_key_for_seed(&delegate_seed(i)),
                miner_pubkey: None,
                balance: self.starting_balance,
            })
            .collect();

        let block = Block {
            version: Block::CURRENT_VERSION,
            height: 0,
            prev_hash: ZERO_HASH,
            timestamp: self.timestamp,
            nonce: 0,
            fuel: 0,
            fuel_rate: INITIAL_FUEL_RATE,
            merkle_root: ZERO_HASH,
            signature: Vec::new(),
            transactions: Vec::new(),
        };

        DevnetGenesis {
            block,
            state: GenesisState {
                accounts,
                delegates: delegates.clone(),
                prices: HashMap::from([
                    (FeeToken::Native, GENESIS_PRICE),
                    (FeeToken::Stable, GENESIS_PRICE),
                ]),
            },
            delegates,
        }
    }
}

/// Keyring holding the keys of the listed delegate indexes.
pub fn local_keyring(indexes: &[usize]) -> Ed25519Keyring {
    let seeds: Vec<[u8; 32]> = indexes.iter().map(|i| delegate_seed(*i)).collect();
    Ed25519Keyring::from_seeds(&seeds)
}
