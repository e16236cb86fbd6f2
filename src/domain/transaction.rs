use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Currency, Units, Wallet, WalletId};

pub type TransactionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    CardPayment,
    Transfer,
    Refund,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::CardPayment => "card_payment",
            TransactionType::Transfer => "transfer",
            TransactionType::Refund => "refund",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "deposit" => Some(TransactionType::Deposit),
            "withdrawal" => Some(TransactionType::Withdrawal),
            "card_payment" => Some(TransactionType::CardPayment),
            "transfer" => Some(TransactionType::Transfer),
            "refund" => Some(TransactionType::Refund),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(TransactionStatus::Pending),
            "completed" => Some(TransactionStatus::Completed),
            "failed" => Some(TransactionStatus::Failed),
            "cancelled" => Some(TransactionStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }

    /// pending -> {completed, failed, cancelled}; terminal states never move.
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        matches!(self, TransactionStatus::Pending) && next.is_terminal()
    }

    pub fn transition_to(
        self,
        next: TransactionStatus,
    ) -> Result<TransactionStatus, StatusTransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(StatusTransitionError {
                from: self,
                to: next,
            })
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransitionError {
    pub from: TransactionStatus,
    pub to: TransactionStatus,
}

impl std::fmt::Display for StatusTransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "transaction cannot move from {} to {}", self.from, self.to)
    }
}

impl std::error::Error for StatusTransitionError {}

/// A ledger entry recording one balance-affecting event on a wallet.
/// Everything except `status` (and `updated_at`) is fixed at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Monotonically increasing sequence number for ordering
    pub sequence: i64,
    pub wallet_id: WalletId,
    pub kind: TransactionType,
    pub status: TransactionStatus,
    /// Amount in base units (always positive)
    pub amount: Units,
    pub currency: Currency,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    /// External reference hash
    pub tx_hash: Option<String>,
    pub description: Option<String>,
    /// Fee in base units, fixed at creation
    pub fee: Units,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new ledger entry. Sequence number must be assigned by the repository.
    pub fn new(
        wallet_id: WalletId,
        kind: TransactionType,
        status: TransactionStatus,
        amount: Units,
        currency: Currency,
    ) -> Self {
        assert!(amount > 0, "Transaction amount must be positive");
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            sequence: 0, // Will be set by repository
            wallet_id,
            kind,
            status,
            amount,
            currency,
            from_address: None,
            to_address: None,
            tx_hash: None,
            description: None,
            fee: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Deposits settle immediately.
    pub fn deposit(wallet: &Wallet, amount: Units, tx_hash: String) -> Self {
        Transaction::new(
            wallet.id,
            TransactionType::Deposit,
            TransactionStatus::Completed,
            amount,
            wallet.currency,
        )
        .with_to_address(wallet.address.clone())
        .with_tx_hash(tx_hash)
        .with_description("Deposit to wallet")
    }

    /// Withdrawals start pending and settle after external confirmation.
    pub fn withdrawal(
        wallet: &Wallet,
        amount: Units,
        to_address: impl Into<String>,
        fee: Units,
        tx_hash: String,
    ) -> Self {
        Transaction::new(
            wallet.id,
            TransactionType::Withdrawal,
            TransactionStatus::Pending,
            amount,
            wallet.currency,
        )
        .with_from_address(wallet.address.clone())
        .with_to_address(to_address)
        .with_tx_hash(tx_hash)
        .with_description("Withdrawal from wallet")
        .with_fee(fee)
    }

    pub fn with_from_address(mut self, address: impl Into<String>) -> Self {
        self.from_address = Some(address.into());
        self
    }

    pub fn with_to_address(mut self, address: impl Into<String>) -> Self {
        self.to_address = Some(address.into());
        self
    }

    pub fn with_tx_hash(mut self, tx_hash: impl Into<String>) -> Self {
        self.tx_hash = Some(tx_hash.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_fee(mut self, fee: Units) -> Self {
        assert!(fee >= 0, "Fee cannot be negative");
        self.fee = fee;
        self
    }

    /// Total debited from the wallet for an outgoing entry.
    pub fn total_debit(&self) -> Units {
        self.amount + self.fee
    }

    pub fn is_pending_withdrawal(&self) -> bool {
        self.kind == TransactionType::Withdrawal && self.status == TransactionStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_wallet() -> Wallet {
        Wallet::new(Uuid::new_v4(), Currency::Btc, "1SampleAddress".into())
    }

    #[test]
    fn test_deposit_is_completed_to_wallet_address() {
        let wallet = sample_wallet();
        let tx = Transaction::deposit(&wallet, 150_000_000, "0xabc".into());

        assert_eq!(tx.kind, TransactionType::Deposit);
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.to_address.as_deref(), Some("1SampleAddress"));
        assert_eq!(tx.fee, 0);
        assert_eq!(tx.description.as_deref(), Some("Deposit to wallet"));
    }

    #[test]
    fn test_withdrawal_is_pending_with_fee() {
        let wallet = sample_wallet();
        let tx = Transaction::withdrawal(&wallet, 50_000_000, "addr1", 50_000, "0xdef".into());

        assert_eq!(tx.kind, TransactionType::Withdrawal);
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.from_address.as_deref(), Some("1SampleAddress"));
        assert_eq!(tx.to_address.as_deref(), Some("addr1"));
        assert_eq!(tx.total_debit(), 50_050_000);
        assert!(tx.is_pending_withdrawal());
    }

    #[test]
    #[should_panic(expected = "Transaction amount must be positive")]
    fn test_transaction_requires_positive_amount() {
        let wallet = sample_wallet();
        Transaction::deposit(&wallet, 0, "0x0".into());
    }

    #[test]
    fn test_status_transitions() {
        use TransactionStatus::*;

        assert!(Pending.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Failed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Pending));

        for terminal in [Completed, Failed, Cancelled] {
            for next in [Pending, Completed, Failed, Cancelled] {
                assert!(!terminal.can_transition_to(next));
            }
        }

        assert_eq!(
            Completed.transition_to(Pending),
            Err(StatusTransitionError {
                from: Completed,
                to: Pending
            })
        );
    }

    #[test]
    fn test_type_roundtrip() {
        for kind in [
            TransactionType::Deposit,
            TransactionType::Withdrawal,
            TransactionType::CardPayment,
            TransactionType::Transfer,
            TransactionType::Refund,
        ] {
            assert_eq!(TransactionType::from_str(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_display_honors_column_width() {
        assert_eq!(
            format!("{:<13}|{:<10}|", TransactionType::Deposit, TransactionStatus::Pending),
            "deposit      |pending   |"
        );
    }
}
