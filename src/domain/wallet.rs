use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Currency, Units, UserId};

pub type WalletId = Uuid;

/// A per-user, per-currency balance holder with a unique deposit address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub id: WalletId,
    pub user_id: UserId,
    pub currency: Currency,
    /// Balance in base units, never negative
    pub balance: Units,
    /// Deposit address, unique across all wallets
    pub address: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(user_id: UserId, currency: Currency, address: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            currency,
            balance: 0,
            address,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if `amount` can be debited without going negative.
    pub fn can_cover(&self, amount: Units) -> bool {
        self.balance >= amount
    }
}

/// A wallet together with its ledger entries, most recent first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletWithTransactions {
    #[serde(flatten)]
    pub wallet: Wallet,
    pub transactions: Vec<super::Transaction>,
}
