//! # Layered Snapshot
//!
//! Ledger view built from a stack of frozen layers plus one local write
//! layer. Writes past `LAYER_LIMIT` freeze the local layer onto the stack.

use crate::entities::{
    fuel, Account, AccountId, ExecutionContext, ExecutionReceipt, FeeToken, Hash, Transaction,
    TxKind,
};
use crate::errors::LedgerError;
use crate::hashing::short_hex;
use crate::ports::{DelegateSource, LedgerSnapshot};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Writes kept in the local layer before it is frozen into the parent chain.
const LAYER_LIMIT: usize = 256;

/// Payload prefix that makes a contract call fail, for exercising
/// execution-failure paths.
pub(crate) const REVERT_PAYLOAD: &[u8] = b"revert";

#[derive(Debug, Default, Clone)]
struct Layer {
    accounts: HashMap<AccountId, Account>,
    confirmed: HashSet<Hash>,
}

impl Layer {
    fn writes(&self) -> usize {
        self.accounts.len() + self.confirmed.len()
    }
}

#[derive(Debug, Default)]
struct Registry {
    delegates: Vec<AccountId>,
    prices: HashMap<FeeToken, u64>,
}

/// Copy-on-write ledger view.
///
/// Frozen layers are shared between clones through `Arc`; the local layer is
/// copied only when a clone that shares it is written to.
#[derive(Debug, Clone)]
pub struct MemorySnapshot {
    registry: Arc<Registry>,
    parents: Vec<Arc<Layer>>,
    local: Arc<Layer>,
}

impl MemorySnapshot {
    pub(crate) fn new(
        accounts: impl IntoIterator<Item = Account>,
        delegates: Vec<AccountId>,
        prices: HashMap<FeeToken, u64>,
    ) -> Self {
        let layer = Layer {
            accounts: accounts.into_iter().map(|a| (a.id, a)).collect(),
            confirmed: HashSet::new(),
        };
        Self {
            registry: Arc::new(Registry { delegates, prices }),
            parents: vec![Arc::new(layer)],
            local: Arc::new(Layer::default()),
        }
    }

    /// Collapses every layer into one, for the canonical state.
    pub(crate) fn flatten(&self) -> Self {
        let mut merged = Layer::default();
        for layer in self.parents.iter().chain(std::iter::once(&self.local)) {
            merged
                .accounts
                .extend(layer.accounts.iter().map(|(k, v)| (*k, v.clone())));
            merged.confirmed.extend(layer.confirmed.iter().copied());
        }
        Self {
            registry: Arc::clone(&self.registry),
            parents: vec![Arc::new(merged)],
            local: Arc::new(Layer::default()),
        }
    }

    /// Adds `amount` to an existing account.
    pub(crate) fn credit(&mut self, id: &AccountId, amount: u64) -> Result<(), LedgerError> {
        let mut account = self
            .account(id)
            .ok_or(LedgerError::AccountNotFound(*id))?;
        account.balance = account.balance.saturating_add(amount);
        self.put_account(account);
        Ok(())
    }

    /// Number of layers, local one included.
    pub fn depth(&self) -> usize {
        self.parents.len() + 1
    }

    fn put_account(&mut self, account: Account) {
        Arc::make_mut(&mut self.local)
            .accounts
            .insert(account.id, account);
        self.maybe_freeze();
    }

    fn mark_confirmed(&mut self, tx_hash: Hash) {
        Arc::make_mut(&mut self.local).confirmed.insert(tx_hash);
        self.maybe_freeze();
    }

    fn maybe_freeze(&mut self) {
        if self.local.writes() >= LAYER_LIMIT {
            let frozen = std::mem::take(&mut self.local);
            self.parents.push(frozen);
        }
    }

    fn run_steps(tx: &Transaction) -> Result<u64, LedgerError> {
        if !tx.kind.is_contract() {
            return Ok(0);
        }
        if tx.payload.starts_with(REVERT_PAYLOAD) {
            return Err(LedgerError::Execution("contract reverted".into()));
        }
        Ok(100 + 10 * tx.payload.len() as u64)
    }
}

impl DelegateSource for MemorySnapshot {
    fn top_delegates(&self) -> Result<Vec<AccountId>, LedgerError> {
        Ok(self.registry.delegates.clone())
    }
}

impl LedgerSnapshot for MemorySnapshot {
    fn is_tx_confirmed(&self, tx_hash: &Hash) -> bool {
        self.local.confirmed.contains(tx_hash)
            || self
                .parents
                .iter()
                .rev()
                .any(|layer| layer.confirmed.contains(tx_hash))
    }

    fn account(&self, id: &AccountId) -> Option<Account> {
        if let Some(account) = self.local.accounts.get(id) {
            return Some(account.clone());
        }
        self.parents
            .iter()
            .rev()
            .find_map(|layer| layer.accounts.get(id).cloned())
    }

    fn median_price(&self, token: FeeToken) -> u64 {
        self.registry.prices.get(&token).copied().unwrap_or(0)
    }

    fn execute(
        &mut self,
        tx: &Transaction,
        ctx: ExecutionContext,
    ) -> Result<ExecutionReceipt, LedgerError> {
        let tx_hash = tx.hash();
        if self.is_tx_confirmed(&tx_hash) {
            return Err(LedgerError::DuplicateTransaction(short_hex(&tx_hash)));
        }

        if tx.kind == TxKind::BlockReward {
            if ctx.index != 0 {
                return Err(LedgerError::InvalidTransaction(format!(
                    "reward transaction at index {}",
                    ctx.index
                )));
            }
            self.credit(&tx.signer, tx.amount)?;
            self.mark_confirmed(tx_hash);
            return Ok(ExecutionReceipt::default());
        }

        let mut sender = self
            .account(&tx.signer)
            .ok_or(LedgerError::AccountNotFound(tx.signer))?;
        let needed = tx.amount.saturating_add(tx.fees);
        if sender.balance < needed {
            return Err(LedgerError::InsufficientBalance {
                account: tx.signer,
                needed,
                available: sender.balance,
            });
        }
        let recipient = match &tx.recipient {
            Some(id) if *id != tx.signer => {
                Some(self.account(id).ok_or(LedgerError::AccountNotFound(*id))?)
            }
            _ => None,
        };

        let run_steps = Self::run_steps(tx)?;
        let used = fuel(run_steps, ctx.fuel_rate);
        if tx.fees < used {
            return Err(LedgerError::InsufficientFee {
                fees: tx.fees,
                fuel: used,
            });
        }

        sender.balance -= needed;
        match recipient {
            Some(mut recipient) => {
                recipient.balance = recipient.balance.saturating_add(tx.amount);
                self.put_account(sender);
                self.put_account(recipient);
            }
            None => {
                // Self-transfer or no recipient: only fees leave the account.
                sender.balance = sender.balance.saturating_add(tx.amount);
                self.put_account(sender);
            }
        }
        self.mark_confirmed(tx_hash);

        Ok(ExecutionReceipt { run_steps })
    }
}
