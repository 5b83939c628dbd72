//! Test utilities for block verification and the crates built on it.
//!
//! [`Devnet`] sets up an in-memory ledger with `N` funded delegates and a
//! keyring holding their keys, and forges blocks that pass the verifier.
//! Enable with the `test-utils` feature flag.

use crate::config::VerifierConfig;
use crate::verifier::BlockVerifier;
use dp_01_delegate_schedule::{DelegateSchedule, ScheduleConfig};
use shared_types::in_memory::{Ed25519Keyring, GenesisState, MemoryLedger, MemorySnapshot};
use shared_types::{
    fuel, Account, AccountId, Block, BlockSigner, ExecutionContext, FeeToken, LedgerSnapshot,
    LedgerStore, PublicKey, Transaction, TxKind, INITIAL_FUEL_RATE, ZERO_HASH,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Genesis timestamp of every devnet.
pub const GENESIS_TIME: u64 = 1_700_000_000;

/// Slot length of every devnet.
pub const BLOCK_INTERVAL: u64 = 10;

/// Starting balance of each delegate and user account.
pub const STARTING_BALANCE: u64 = 1_000_000_000;

/// Number of funded non-delegate accounts.
pub const USER_COUNT: usize = 4;

/// Key seed of delegate `i`.
pub fn delegate_seed(i: usize) -> [u8; 32] {
    let mut seed = [0u8; 32];
    seed[0] = 0xD1;
    seed[1..9].copy_from_slice(&(i as u64).to_le_bytes());
    seed
}

/// Key seed of user `i`.
pub fn user_seed(i: usize) -> [u8; 32] {
    let mut seed = [0u8; 32];
    seed[0] = 0xE5;
    seed[1..9].copy_from_slice(&(i as u64).to_le_bytes());
    seed
}

/// In-memory network of `N` delegates.
pub struct Devnet {
    pub ledger: Arc<MemoryLedger>,
    pub keyring: Arc<Ed25519Keyring>,
    pub schedule: Arc<DelegateSchedule>,
    pub delegates: Vec<AccountId>,
    pub users: Vec<AccountId>,
    pub verifier_config: VerifierConfig,
    owner_keys: HashMap<AccountId, PublicKey>,
    memo: AtomicU64,
}

impl Devnet {
    pub fn new(n: usize) -> Self {
        let delegates: Vec<AccountId> = (0..n).map(|i| AccountId::new(0, i as u16 + 1)).collect();
        let users: Vec<AccountId> = (0..USER_COUNT)
            .map(|i| AccountId::new(0, i as u16 + 1000))
            .collect();

        let keyring = Ed25519Keyring::new();
        let mut owner_keys = HashMap::new();
        let mut accounts = Vec::new();
        for (i, id) in delegates.iter().enumerate() {
            let pubkey = keyring.insert_seed(delegate_seed(i));
            owner_keys.insert(*id, pubkey);
            accounts.push(account(*id, pubkey));
        }
        for (i, id) in users.iter().enumerate() {
            let pubkey = Ed25519Keyring::public_key_for_seed(&user_seed(i));
            accounts.push(account(*id, pubkey));
        }

        let genesis = genesis_block();
        let verifier_config = VerifierConfig {
            genesis_hash: genesis.hash(),
            ..Default::default()
        };
        let ledger = MemoryLedger::new(
            genesis,
            GenesisState {
                accounts,
                delegates: delegates.clone(),
                prices: HashMap::from([(FeeToken::Native, 10_000), (FeeToken::Stable, 10_000)]),
            },
        );
        let schedule = DelegateSchedule::new(ScheduleConfig {
            total_delegates: n,
            block_interval_secs: BLOCK_INTERVAL,
            interval_fork: None,
        })
        .expect("valid devnet schedule");

        Self {
            ledger: Arc::new(ledger),
            keyring: Arc::new(keyring),
            schedule: Arc::new(schedule),
            delegates,
            users,
            verifier_config,
            owner_keys,
            memo: AtomicU64::new(0),
        }
    }

    pub fn verifier(&self) -> BlockVerifier {
        BlockVerifier::new(
            self.verifier_config.clone(),
            Arc::clone(&self.schedule),
            self.keyring.clone(),
        )
    }

    pub fn genesis(&self) -> Block {
        self.ledger.genesis()
    }

    /// Keyring holding only the listed delegates' keys.
    pub fn keyring_for(&self, delegate_indexes: &[usize]) -> Ed25519Keyring {
        let seeds: Vec<[u8; 32]> = delegate_indexes.iter().map(|i| delegate_seed(*i)).collect();
        Ed25519Keyring::from_seeds(&seeds)
    }

    /// First timestamp at or after `not_before` whose slot belongs to `producer`.
    pub fn slot_time_for(&self, height: u64, not_before: u64, producer: AccountId) -> u64 {
        let state = self.ledger.snapshot();
        let span = self.delegates.len() as u64 * 4;
        (0..span)
            .map(|k| not_before + k * BLOCK_INTERVAL)
            .find(|ts| {
                self.schedule
                    .expected_producer(height, *ts, &state)
                    .map(|expected| expected == producer)
                    .unwrap_or(false)
            })
            .expect("producer scheduled within four rounds")
    }

    /// Empty block on `parent` produced by `producer`.
    pub fn forge_empty(&self, parent: &Block, producer: AccountId) -> Block {
        self.forge(parent, producer, Vec::new(), &self.ledger.snapshot())
    }

    /// Block on `parent` produced by `producer`, carrying `txs`.
    ///
    /// `state` must be the ledger view after `parent`; it is used to compute
    /// fuel and reward.
    pub fn forge(
        &self,
        parent: &Block,
        producer: AccountId,
        txs: Vec<Transaction>,
        state: &MemorySnapshot,
    ) -> Block {
        let height = parent.height + 1;
        let timestamp = self.slot_time_for(height, parent.timestamp + BLOCK_INTERVAL, producer);
        self.forge_at(parent, producer, timestamp, txs, state)
    }

    /// Like [`Devnet::forge`] with an explicit timestamp.
    pub fn forge_at(
        &self,
        parent: &Block,
        producer: AccountId,
        timestamp: u64,
        txs: Vec<Transaction>,
        state: &MemorySnapshot,
    ) -> Block {
        let height = parent.height + 1;
        let fuel_rate = parent.fuel_rate.max(1);

        let mut trial = state.clone();
        let mut total_fuel = 0;
        let mut reward = 0;
        for (i, tx) in txs.iter().enumerate() {
            let receipt = trial
                .execute(
                    tx,
                    ExecutionContext {
                        height,
                        index: i + 1,
                        fuel_rate,
                    },
                )
                .expect("forged transaction executes");
            let tx_fuel = fuel(receipt.run_steps, fuel_rate);
            total_fuel += tx_fuel;
            reward += tx.fees.saturating_sub(tx_fuel);
        }

        let mut transactions = vec![Transaction::reward(producer, height, reward)];
        transactions.extend(txs);

        let mut block = Block {
            version: Block::CURRENT_VERSION,
            height,
            prev_hash: parent.hash(),
            timestamp,
            nonce: 0,
            fuel: total_fuel,
            fuel_rate,
            merkle_root: ZERO_HASH,
            signature: Vec::new(),
            transactions,
        };
        self.seal(&mut block);
        block
    }

    /// Recomputes the merkle root and re-signs with the producer's owner key.
    pub fn seal(&self, block: &mut Block) {
        block.merkle_root = block.compute_merkle_root();
        self.sign(block);
    }

    /// Re-signs with the producer's owner key, leaving every other field.
    pub fn sign(&self, block: &mut Block) {
        let producer = block.producer().expect("block has a reward transaction");
        let pubkey = self.owner_keys[&producer];
        block.signature = self
            .keyring
            .sign(&pubkey, &block.signature_hash())
            .expect("devnet holds every delegate key");
    }

    /// Transfer between two devnet users; every call yields a distinct hash.
    pub fn transfer(&self, from: usize, to: usize, amount: u64, fees: u64) -> Transaction {
        let memo = self.memo.fetch_add(1, Ordering::SeqCst);
        Transaction {
            kind: TxKind::Transfer,
            version: Transaction::CURRENT_VERSION,
            signer: self.users[from],
            recipient: Some(self.users[to]),
            amount,
            valid_height: 0,
            fee_token: FeeToken::Native,
            fees,
            payload: memo.to_le_bytes().to_vec(),
            signature: vec![0xAA; 64],
        }
    }

    /// Contract call with a payload of `payload_len` bytes.
    pub fn contract_call(&self, from: usize, payload_len: usize, fees: u64) -> Transaction {
        let memo = self.memo.fetch_add(1, Ordering::SeqCst);
        let mut payload = memo.to_le_bytes().to_vec();
        payload.resize(payload_len.max(8), 0);
        Transaction {
            kind: TxKind::ContractCall,
            version: Transaction::CURRENT_VERSION,
            signer: self.users[from],
            recipient: None,
            amount: 0,
            valid_height: 0,
            fee_token: FeeToken::Native,
            fees,
            payload,
            signature: vec![0xAA; 64],
        }
    }
}

fn account(id: AccountId, owner_pubkey: PublicKey) -> Account {
    Account {
        id,
        owner_pubkey,
        miner_pubkey: None,
        balance: STARTING_BALANCE,
    }
}

fn genesis_block() -> Block {
    Block {
        version: Block::CURRENT_VERSION,
        height: 0,
        prev_hash: ZERO_HASH,
        timestamp: GENESIS_TIME,
        nonce: 0,
        fuel: 0,
        fuel_rate: INITIAL_FUEL_RATE,
        merkle_root: ZERO_HASH,
        signature: Vec::new(),
        transactions: Vec::new(),
    }
}
