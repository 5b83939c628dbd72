//! Greedy transaction packing under size, run-step and time ceilings.
//!
//! Every candidate is trial-executed on a clone of the working state; only a
//! successful trial is merged back and appended. Failures skip the candidate
//! and never abort the block.

use super::priority::TxPriority;
use shared_types::{fuel, short_hex, ExecutionContext, Hash, LedgerSnapshot, Transaction};
use std::time::Instant;
use tracing::{debug, instrument};

/// Ceilings a packed block must stay under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackingLimits {
    pub max_block_size: u64,
    pub max_block_run_steps: u64,
}

/// Result of one packing pass.
#[derive(Debug, Clone)]
pub struct PackedTransactions<S> {
    pub transactions: Vec<Transaction>,
    pub total_fuel: u64,
    pub total_run_steps: u64,
    pub total_fees: u64,
    /// Sum of `fees - fuel` over the packed transactions
    pub reward: u64,
    /// Serialized size of the block including the reward transaction
    pub block_size: u64,
    /// Ledger view after every packed transaction
    pub state: S,
}

pub struct TransactionPacker {
    limits: PackingLimits,
    height: u64,
    fuel_rate: u64,
}

impl TransactionPacker {
    pub fn new(limits: PackingLimits, height: u64, fuel_rate: u64) -> Self {
        Self {
            limits,
            height,
            fuel_rate,
        }
    }

    /// Packs `candidates` in order on top of `base`.
    ///
    /// `base_size` is the serialized size of the block holding only its
    /// reward transaction. Candidates for which `is_pending` holds are
    /// already in a pooled block and are skipped, as are candidates already
    /// confirmed in the working state. Packing stops at `deadline`.
    #[instrument(skip_all, fields(height = self.height, candidates = candidates.len()))]
    pub fn pack<S: LedgerSnapshot>(
        &self,
        candidates: Vec<TxPriority>,
        base: S,
        base_size: u64,
        is_pending: impl Fn(&Hash) -> bool,
        deadline: Instant,
    ) -> PackedTransactions<S> {
        let mut packed = PackedTransactions {
            transactions: Vec::new(),
            total_fuel: 0,
            total_run_steps: 0,
            total_fees: 0,
            reward: 0,
            block_size: base_size,
            state: base,
        };

        for candidate in candidates {
            if Instant::now() >= deadline {
                debug!(
                    "[dp-04] Packing deadline reached at height {} with {} txs",
                    self.height,
                    packed.transactions.len()
                );
                break;
            }

            let tx = candidate.tx;
            let tx_hash = tx.hash();
            if packed.state.is_tx_confirmed(&tx_hash) || is_pending(&tx_hash) {
                debug!("[dp-04] Skipping duplicate tx {}", short_hex(&tx_hash));
                continue;
            }

            if packed.block_size + candidate.size >= self.limits.max_block_size {
                debug!(
                    "[dp-04] Skipping tx {}: block size limit {}",
                    short_hex(&tx_hash),
                    self.limits.max_block_size
                );
                continue;
            }

            let mut trial = packed.state.clone();
            let ctx = ExecutionContext {
                height: self.height,
                index: packed.transactions.len() + 1,
                fuel_rate: self.fuel_rate,
            };
            let receipt = match trial.execute(&tx, ctx) {
                Ok(receipt) => receipt,
                Err(e) => {
                    debug!(
                        "[dp-04] Failed to pack tx {} at height {}: {}",
                        short_hex(&tx_hash),
                        self.height,
                        e
                    );
                    continue;
                }
            };

            if packed.total_run_steps + receipt.run_steps >= self.limits.max_block_run_steps {
                debug!(
                    "[dp-04] Skipping tx {}: run step limit {}",
                    short_hex(&tx_hash),
                    self.limits.max_block_run_steps
                );
                continue;
            }

            let tx_fuel = fuel(receipt.run_steps, self.fuel_rate);
            let Some(surplus) = tx.fees.checked_sub(tx_fuel) else {
                debug!(
                    "[dp-04] Skipping tx {}: fees {} below fuel {}",
                    short_hex(&tx_hash),
                    tx.fees,
                    tx_fuel
                );
                continue;
            };

            packed.state = trial;
            packed.block_size += candidate.size;
            packed.total_run_steps += receipt.run_steps;
            packed.total_fuel += tx_fuel;
            packed.total_fees += tx.fees;
            packed.reward += surplus;
            packed.transactions.push(tx);
        }

        debug!(
            "[dp-04] Packed {} txs at height {}: size {}, steps {}, fuel {}",
            packed.transactions.len(),
            self.height,
            packed.block_size,
            packed.total_run_steps,
            packed.total_fuel
        );
        packed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dp_02_block_verification::test_utils::Devnet;
    use shared_types::in_memory::MemorySnapshot;
    use shared_types::{
        Account, AccountId, DelegateSource, ExecutionReceipt, FeeToken, LedgerError, LedgerStore,
    };
    use std::time::Duration;

    /// View that executes everything and bills a fixed step count.
    #[derive(Clone)]
    struct FixedStepState {
        inner: MemorySnapshot,
        steps: u64,
    }

    impl DelegateSource for FixedStepState {
        fn top_delegates(&self) -> std::result::Result<Vec<AccountId>, LedgerError> {
            self.inner.top_delegates()
        }
    }

    impl LedgerSnapshot for FixedStepState {
        fn is_tx_confirmed(&self, tx_hash: &Hash) -> bool {
            self.inner.is_tx_confirmed(tx_hash)
        }

        fn account(&self, id: &AccountId) -> Option<Account> {
            self.inner.account(id)
        }

        fn median_price(&self, token: FeeToken) -> u64 {
            self.inner.median_price(token)
        }

        fn execute(
            &mut self,
            _tx: &Transaction,
            _ctx: ExecutionContext,
        ) -> std::result::Result<ExecutionReceipt, LedgerError> {
            Ok(ExecutionReceipt {
                run_steps: self.steps,
            })
        }
    }

    const BASE_SIZE: u64 = 200;

    fn candidate(tx: Transaction) -> TxPriority {
        TxPriority {
            priority: 1.0,
            fee_per_kb: 1.0,
            size: tx.serialized_size(),
            tx,
        }
    }

    fn packer(max_block_size: u64, max_block_run_steps: u64) -> TransactionPacker {
        TransactionPacker::new(
            PackingLimits {
                max_block_size,
                max_block_run_steps,
            },
            1,
            100,
        )
    }

    fn later() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    fn pack_all(
        packer: &TransactionPacker,
        txs: Vec<Transaction>,
        state: MemorySnapshot,
    ) -> PackedTransactions<MemorySnapshot> {
        let candidates = txs.into_iter().map(candidate).collect();
        packer.pack(candidates, state, BASE_SIZE, |_| false, later())
    }

    #[test]
    fn test_packs_and_accounts_fuel() {
        let devnet = Devnet::new(3);
        let transfer = devnet.transfer(0, 1, 100, 1_000);
        let call = devnet.contract_call(1, 100, 5_000);

        let packed = pack_all(
            &packer(1_000_000, 12_000_000),
            vec![transfer.clone(), call.clone()],
            devnet.ledger.snapshot(),
        );

        assert_eq!(packed.transactions, vec![transfer.clone(), call.clone()]);
        assert_eq!(packed.total_run_steps, 1_100);
        assert_eq!(packed.total_fuel, 1_100);
        assert_eq!(packed.total_fees, 6_000);
        assert_eq!(packed.reward, 6_000 - 1_100);
        assert_eq!(
            packed.block_size,
            BASE_SIZE + transfer.serialized_size() + call.serialized_size()
        );
        assert!(packed.state.is_tx_confirmed(&call.hash()));
    }

    #[test]
    fn test_skips_duplicates_and_pending() {
        let devnet = Devnet::new(3);
        let first = devnet.transfer(0, 1, 100, 1_000);
        let pending = devnet.transfer(1, 2, 100, 1_000);
        let pending_hash = pending.hash();

        let candidates = vec![
            candidate(first.clone()),
            candidate(first.clone()),
            candidate(pending),
        ];
        let packed = packer(1_000_000, 12_000_000).pack(
            candidates,
            devnet.ledger.snapshot(),
            BASE_SIZE,
            |h| *h == pending_hash,
            later(),
        );
        assert_eq!(packed.transactions, vec![first]);
    }

    #[test]
    fn test_failed_execution_skipped() {
        let devnet = Devnet::new(3);
        let underpaid = devnet.contract_call(0, 100, 10);
        let good = devnet.transfer(1, 2, 100, 1_000);

        let state = devnet.ledger.snapshot();
        let packed = pack_all(
            &packer(1_000_000, 12_000_000),
            vec![underpaid.clone(), good.clone()],
            state,
        );
        assert_eq!(packed.transactions, vec![good]);
        assert!(!packed.state.is_tx_confirmed(&underpaid.hash()));
    }

    #[test]
    fn test_size_ceiling() {
        let devnet = Devnet::new(3);
        let a = devnet.transfer(0, 1, 100, 1_000);
        let b = devnet.transfer(1, 2, 100, 1_000);
        let max = BASE_SIZE + a.serialized_size() + b.serialized_size();

        let packed = pack_all(
            &packer(max, 12_000_000),
            vec![a.clone(), b],
            devnet.ledger.snapshot(),
        );
        assert_eq!(packed.transactions, vec![a]);
    }

    #[test]
    fn test_run_step_ceiling() {
        let devnet = Devnet::new(3);
        let a = devnet.contract_call(0, 100, 5_000);
        let b = devnet.contract_call(1, 100, 5_000);
        let small = devnet.transfer(2, 3, 1, 1_000);

        let packed = pack_all(
            &packer(1_000_000, 2_000),
            vec![a.clone(), b, small.clone()],
            devnet.ledger.snapshot(),
        );
        assert_eq!(packed.transactions, vec![a, small]);
        assert_eq!(packed.total_run_steps, 1_100);
    }

    #[test]
    fn test_expired_deadline_packs_nothing() {
        let devnet = Devnet::new(3);
        let tx = devnet.transfer(0, 1, 100, 1_000);
        let packed = packer(1_000_000, 12_000_000).pack(
            vec![candidate(tx)],
            devnet.ledger.snapshot(),
            BASE_SIZE,
            |_| false,
            Instant::now(),
        );
        assert!(packed.transactions.is_empty());
        assert_eq!(packed.block_size, BASE_SIZE);
    }

    #[test]
    fn test_fees_below_fuel_skipped() {
        let devnet = Devnet::new(3);
        let cheap = devnet.transfer(0, 1, 100, 1_000);
        let rich = devnet.transfer(1, 2, 100, 50_000);
        let state = FixedStepState {
            inner: devnet.ledger.snapshot(),
            steps: 10_000,
        };

        let candidates = vec![candidate(cheap), candidate(rich.clone())];
        let packed = packer(1_000_000, 12_000_000).pack(
            candidates,
            state,
            BASE_SIZE,
            |_| false,
            later(),
        );

        assert_eq!(packed.transactions, vec![rich]);
        assert_eq!(packed.total_fuel, 10_000);
        assert_eq!(packed.reward, 40_000);
    }
}
