//! Mempool candidate ordering.

use shared_types::{fuel, LedgerSnapshot, MempoolEntry, Transaction};
use std::cmp::Ordering;

/// A mempool transaction ranked for packing.
#[derive(Debug, Clone)]
pub struct TxPriority {
    /// Age/size priority reported by the mempool
    pub priority: f64,
    /// Net fee per kilobyte, in native units
    pub fee_per_kb: f64,
    pub size: u64,
    pub tx: Transaction,
}

/// Net fee per kilobyte, converting the fee token through its median price.
///
/// Run steps are unknown before execution, so only the zero-step fuel is
/// deducted here.
pub fn fee_per_kb(
    tx: &Transaction,
    size: u64,
    median_price: u64,
    price_boost: u64,
    fuel_rate: u64,
) -> f64 {
    let net = tx.fees.saturating_sub(fuel(0, fuel_rate)) as f64;
    let kb = size.max(1) as f64 / 1000.0;
    median_price as f64 / price_boost.max(1) as f64 * net / kb
}

/// Ranks mempool entries best first, dropping rewards and transactions
/// already confirmed in `state`.
pub fn prioritize<S: LedgerSnapshot>(
    entries: Vec<MempoolEntry>,
    state: &S,
    price_boost: u64,
    fuel_rate: u64,
) -> Vec<TxPriority> {
    let mut ranked: Vec<TxPriority> = entries
        .into_iter()
        .filter(|e| !e.tx.is_reward() && !state.is_tx_confirmed(&e.tx.hash()))
        .map(|e| {
            let price = state.median_price(e.tx.fee_token);
            TxPriority {
                priority: e.priority,
                fee_per_kb: fee_per_kb(&e.tx, e.size, price, price_boost, fuel_rate),
                size: e.size,
                tx: e.tx,
            }
        })
        .collect();
    ranked.sort_by(compare);
    ranked
}

/// Higher priority first, then higher fee per kilobyte, then hash.
fn compare(a: &TxPriority, b: &TxPriority) -> Ordering {
    b.priority
        .total_cmp(&a.priority)
        .then_with(|| b.fee_per_kb.total_cmp(&a.fee_per_kb))
        .then_with(|| a.tx.hash().cmp(&b.tx.hash()))
}
