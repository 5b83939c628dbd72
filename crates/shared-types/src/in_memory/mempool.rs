//! In-memory mempool keyed by transaction hash, validated against the
//! ledger's canonical view on admission.

use crate::entities::{ExecutionContext, Hash, MempoolEntry, Transaction};
use crate::errors::LedgerError;
use crate::hashing::short_hex;
use crate::ports::{LedgerSnapshot, LedgerStore, Mempool, TimeSource};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

struct Pooled {
    tx: Transaction,
    size: u64,
    entered_at: u64,
}

/// Mempool that validates offers against the canonical ledger state.
pub struct MemoryMempool<L: LedgerStore> {
    ledger: Arc<L>,
    clock: Arc<dyn TimeSource>,
    entries: RwLock<HashMap<Hash, Pooled>>,
    counter: AtomicU64,
}

impl<L: LedgerStore> MemoryMempool<L> {
    pub fn new(ledger: Arc<L>, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            ledger,
            clock,
            entries: RwLock::new(HashMap::new()),
            counter: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains(&self, tx_hash: &Hash) -> bool {
        self.entries.read().contains_key(tx_hash)
    }

    fn validate(&self, tx: &Transaction) -> Result<(), LedgerError> {
        if tx.is_reward() {
            return Err(LedgerError::InvalidTransaction(
                "reward transactions are not relayed".into(),
            ));
        }
        let tip = self.ledger.tip();
        let mut trial = self.ledger.snapshot();
        trial.execute(
            tx,
            ExecutionContext {
                height: tip.height + 1,
                index: 1,
                fuel_rate: tip.fuel_rate,
            },
        )?;
        Ok(())
    }
}

impl<L: LedgerStore> Mempool for MemoryMempool<L> {
    fn pending(&self) -> Vec<MempoolEntry> {
        let now = self.clock.now();
        self.entries
            .read()
            .values()
            .map(|p| {
                let age = now.saturating_sub(p.entered_at) + 1;
                MempoolEntry {
                    tx: p.tx.clone(),
                    size: p.size,
                    priority: age as f64 * 1000.0 / p.size.max(1) as f64,
                }
            })
            .collect()
    }

    fn offer(&self, tx: Transaction) -> Result<(), LedgerError> {
        let tx_hash = tx.hash();
        if self.contains(&tx_hash) {
            return Err(LedgerError::DuplicateTransaction(short_hex(&tx_hash)));
        }
        self.validate(&tx)?;

        let size = tx.serialized_size();
        self.entries.write().insert(
            tx_hash,
            Pooled {
                tx,
                size,
                entered_at: self.clock.now(),
            },
        );
        self.counter.fetch_add(1, Ordering::SeqCst);
        debug!("[mempool] Accepted tx {}", short_hex(&tx_hash));
        Ok(())
    }

    fn remove(&self, tx_hash: &Hash) {
        if self.entries.write().remove(tx_hash).is_some() {
            self.counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn update_counter(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}
