use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Currency, Transaction, TransactionStatus, TransactionType, Units, WalletId};

/// Effect of a single ledger entry on its wallet's balance.
///
/// Deposits and refunds credit once completed. Withdrawals debit
/// `amount + fee` from initiation, so pending and completed ones count,
/// while failed or cancelled ones were refunded and count for nothing.
pub fn balance_effect(tx: &Transaction) -> Units {
    use TransactionStatus::*;
    use TransactionType::*;

    match (tx.kind, tx.status) {
        (Deposit | Refund, Completed) => tx.amount,
        (Withdrawal, Pending | Completed) => -tx.total_debit(),
        (CardPayment | Transfer, Completed) => -tx.total_debit(),
        _ => 0,
    }
}

/// Replay the balance of a wallet from its ledger entries.
pub fn compute_balance(wallet_id: WalletId, transactions: &[Transaction]) -> Units {
    transactions
        .iter()
        .filter(|tx| tx.wallet_id == wallet_id)
        .map(balance_effect)
        .sum()
}

/// Aggregate counters over a user's ledger entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionStats {
    pub total_transactions: i64,
    /// Sum of completed deposit amounts, across currencies
    pub total_deposits: Units,
    /// Sum of completed withdrawal amounts, across currencies
    pub total_withdrawals: Units,
    pub pending_count: i64,
    pub completed_count: i64,
    pub failed_count: i64,
    pub by_currency: BTreeMap<Currency, CurrencyTotals>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyTotals {
    pub deposits: Units,
    pub withdrawals: Units,
    pub fees: Units,
}

/// Compute statistics by scanning every transaction once.
pub fn compute_stats(transactions: &[Transaction]) -> TransactionStats {
    let mut stats = TransactionStats::default();

    for tx in transactions {
        stats.total_transactions += 1;

        match tx.status {
            TransactionStatus::Pending => stats.pending_count += 1,
            TransactionStatus::Completed => stats.completed_count += 1,
            TransactionStatus::Failed => stats.failed_count += 1,
            TransactionStatus::Cancelled => {}
        }

        if tx.status != TransactionStatus::Completed {
            continue;
        }

        let totals = stats.by_currency.entry(tx.currency).or_default();
        match tx.kind {
            TransactionType::Deposit => {
                stats.total_deposits += tx.amount;
                totals.deposits += tx.amount;
            }
            TransactionType::Withdrawal => {
                stats.total_withdrawals += tx.amount;
                totals.withdrawals += tx.amount;
                totals.fees += tx.fee;
            }
            _ => {}
        }
    }

    stats
}

/// A wallet whose stored balance disagrees with its replayed ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDiscrepancy {
    pub wallet_id: WalletId,
    pub currency: Currency,
    pub stored: Units,
    pub replayed: Units,
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::domain::Wallet;

    fn wallet(currency: Currency) -> Wallet {
        Wallet::new(Uuid::new_v4(), currency, format!("addr-{}", Uuid::new_v4()))
    }

    fn with_status(mut tx: Transaction, status: TransactionStatus) -> Transaction {
        tx.status = status;
        tx
    }

    #[test]
    fn test_compute_balance_empty() {
        assert_eq!(compute_balance(Uuid::new_v4(), &[]), 0);
    }

    #[test]
    fn test_compute_balance_deposit_and_withdrawal() {
        let w = wallet(Currency::Btc);
        let txs = vec![
            Transaction::deposit(&w, 150_000_000, "0x1".into()),
            Transaction::withdrawal(&w, 50_000_000, "addr1", 50_000, "0x2".into()),
        ];

        // Pending withdrawal is already debited
        assert_eq!(compute_balance(w.id, &txs), 99_950_000);
    }

    #[test]
    fn test_failed_and_cancelled_withdrawals_are_refunded() {
        let w = wallet(Currency::Eth);
        let txs = vec![
            Transaction::deposit(&w, 1_000, "0x1".into()),
            with_status(
                Transaction::withdrawal(&w, 500, "a", 1, "0x2".into()),
                TransactionStatus::Failed,
            ),
            with_status(
                Transaction::withdrawal(&w, 300, "b", 0, "0x3".into()),
                TransactionStatus::Cancelled,
            ),
        ];

        assert_eq!(compute_balance(w.id, &txs), 1_000);
    }

    #[test]
    fn test_compute_balance_ignores_other_wallets() {
        let a = wallet(Currency::Btc);
        let b = wallet(Currency::Btc);
        let txs = vec![
            Transaction::deposit(&a, 10, "0x1".into()),
            Transaction::deposit(&b, 20, "0x2".into()),
        ];

        assert_eq!(compute_balance(a.id, &txs), 10);
        assert_eq!(compute_balance(b.id, &txs), 20);
    }

    #[test]
    fn test_compute_stats() {
        let btc = wallet(Currency::Btc);
        let eth = wallet(Currency::Eth);
        let txs = vec![
            Transaction::deposit(&btc, 100, "0x1".into()),
            Transaction::deposit(&eth, 50, "0x2".into()),
            with_status(
                Transaction::withdrawal(&btc, 40, "a", 1, "0x3".into()),
                TransactionStatus::Completed,
            ),
            Transaction::withdrawal(&btc, 10, "b", 0, "0x4".into()),
            with_status(
                Transaction::withdrawal(&eth, 5, "c", 0, "0x5".into()),
                TransactionStatus::Failed,
            ),
        ];

        let stats = compute_stats(&txs);

        assert_eq!(stats.total_transactions, 5);
        assert_eq!(stats.total_deposits, 150);
        assert_eq!(stats.total_withdrawals, 40);
        assert_eq!(stats.pending_count, 1);
        assert_eq!(stats.completed_count, 3);
        assert_eq!(stats.failed_count, 1);

        let btc_totals = &stats.by_currency[&Currency::Btc];
        assert_eq!(btc_totals.deposits, 100);
        assert_eq!(btc_totals.withdrawals, 40);
        assert_eq!(btc_totals.fees, 1);
    }
}
