use std::sync::Arc;

use tracing::{info, warn};

use crate::config::LedgerConfig;
use crate::domain::{
    BalanceDiscrepancy, Currency, Owner, StatusTransitionError, Transaction, TransactionId,
    TransactionStats, TransactionStatus, TransactionType, Units, UserId, Wallet, WalletId,
    WalletWithTransactions, compute_balance, compute_stats, fee_for,
};
use crate::integrations::{
    Blockchain, LogNotifier, Notification, Notifier, SimulatedChain, dispatch_notification,
};
use crate::storage::{Repository, WalletInsert};

use super::{AppError, SettlementScheduler};

/// Wallet ledger service: the only component allowed to move balances or
/// transaction statuses. This is the primary interface for any client.
pub struct WalletService {
    repo: Repository,
    chain: Arc<dyn Blockchain>,
    notifier: Arc<dyn Notifier>,
    settlements: SettlementScheduler,
    config: LedgerConfig,
}

/// Result of a balance-affecting operation
#[derive(Debug, Clone)]
pub struct Receipt {
    pub transaction: Transaction,
    pub new_balance: Units,
}

impl WalletService {
    /// Create a service with the offline chain and log-only notifications.
    pub fn new(repo: Repository, config: LedgerConfig) -> Self {
        Self::with_integrations(
            repo,
            config,
            Arc::new(SimulatedChain::new()),
            Arc::new(LogNotifier),
        )
    }

    pub fn with_integrations(
        repo: Repository,
        config: LedgerConfig,
        chain: Arc<dyn Blockchain>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let settlements =
            SettlementScheduler::new(repo.clone(), chain.clone(), config.settlement_delay);
        Self {
            repo,
            chain,
            notifier,
            settlements,
            config,
        }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str, config: LedgerConfig) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo, config))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str, config: LedgerConfig) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo, config))
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn settlements(&self) -> &SettlementScheduler {
        &self.settlements
    }

    // ========================
    // Wallet operations
    // ========================

    /// Create the user's wallet for `currency`, with a fresh deposit address.
    pub async fn create_wallet(
        &self,
        user_id: UserId,
        currency: Currency,
    ) -> Result<Wallet, AppError> {
        if self.repo.find_wallet(user_id, currency).await?.is_some() {
            return Err(AppError::WalletAlreadyExists(currency.to_string()));
        }

        let attempts = self.config.max_generation_attempts;
        for attempt in 1..=attempts {
            let address = self.chain.generate_address(currency);
            let wallet = Wallet::new(user_id, currency, address);

            match self.repo.save_wallet(&wallet).await? {
                WalletInsert::Inserted => {
                    info!(wallet_id = %wallet.id, user_id = %user_id, %currency, "wallet created");
                    return Ok(wallet);
                }
                WalletInsert::AddressTaken => {
                    warn!(attempt, %currency, "deposit address collision, regenerating");
                }
                WalletInsert::CurrencyTaken => {
                    return Err(AppError::WalletAlreadyExists(currency.to_string()));
                }
            }
        }

        Err(AppError::GenerationExhausted {
            what: "deposit address",
            attempts,
        })
    }

    /// All active wallets of a user, newest first, with their transactions.
    pub async fn get_user_wallets(
        &self,
        user_id: UserId,
    ) -> Result<Vec<WalletWithTransactions>, AppError> {
        let wallets = self.repo.list_user_wallets(user_id, false).await?;
        let mut result = Vec::with_capacity(wallets.len());

        for wallet in wallets {
            let transactions = self.repo.list_wallet_transactions(wallet.id).await?;
            result.push(WalletWithTransactions {
                wallet,
                transactions,
            });
        }

        Ok(result)
    }

    /// Ownership-checked wallet lookup, including its transactions.
    pub async fn get_wallet_by_id(
        &self,
        wallet_id: WalletId,
        owner_id: UserId,
    ) -> Result<WalletWithTransactions, AppError> {
        let wallet = self.owned_wallet(wallet_id, owner_id).await?;
        let transactions = self.repo.list_wallet_transactions(wallet.id).await?;
        Ok(WalletWithTransactions {
            wallet,
            transactions,
        })
    }

    /// Ownership-checked list of a wallet's transactions, most recent first.
    pub async fn get_wallet_transactions(
        &self,
        wallet_id: WalletId,
        owner_id: UserId,
    ) -> Result<Vec<Transaction>, AppError> {
        let wallet = self.owned_wallet(wallet_id, owner_id).await?;
        Ok(self.repo.list_wallet_transactions(wallet.id).await?)
    }

    /// Soft-disable a wallet. It keeps its history but stops moving money.
    pub async fn deactivate_wallet(
        &self,
        wallet_id: WalletId,
        owner_id: UserId,
    ) -> Result<Wallet, AppError> {
        let wallet = self.owned_wallet(wallet_id, owner_id).await?;
        if !self.repo.deactivate_wallet(wallet.id).await? {
            return Err(AppError::WalletInactive(wallet_id.to_string()));
        }

        info!(wallet_id = %wallet.id, "wallet deactivated");
        self.owned_wallet(wallet_id, owner_id).await
    }

    /// Hard-delete a wallet and its ledger, cancelling any pending settlement.
    pub async fn delete_wallet(&self, wallet_id: WalletId, owner_id: UserId) -> Result<Wallet, AppError> {
        let wallet = self.owned_wallet(wallet_id, owner_id).await?;

        for tx in self.repo.list_wallet_transactions(wallet.id).await? {
            if tx.is_pending_withdrawal() {
                self.settlements.cancel(tx.id);
            }
        }

        if !self.repo.delete_wallet(wallet.id).await? {
            return Err(AppError::WalletNotFound(wallet_id.to_string()));
        }

        info!(wallet_id = %wallet.id, "wallet deleted");
        Ok(wallet)
    }

    // ========================
    // Balance operations
    // ========================

    /// Credit a wallet. Deposits settle immediately.
    pub async fn deposit(
        &self,
        wallet_id: WalletId,
        owner: &Owner,
        amount: Units,
    ) -> Result<Receipt, AppError> {
        validate_amount(amount)?;

        let wallet = self.owned_wallet(wallet_id, owner.id).await?;
        ensure_active(&wallet)?;

        let mut transaction = Transaction::deposit(&wallet, amount, self.chain.reference_hash());

        let new_balance = match self.repo.record_deposit(&mut transaction).await? {
            Some(balance) => balance,
            None => {
                let current = self.current_wallet(wallet_id).await?;
                return Err(AppError::InvalidAmount(format!(
                    "Deposit would overflow the balance of {}",
                    current.id
                )));
            }
        };

        info!(
            wallet_id = %wallet.id,
            transaction_id = %transaction.id,
            amount,
            new_balance,
            "deposit completed"
        );
        self.notify_transaction(owner, &transaction);

        Ok(Receipt {
            transaction,
            new_balance,
        })
    }

    /// Debit `amount + fee` now and schedule settlement of the withdrawal.
    pub async fn withdraw(
        &self,
        wallet_id: WalletId,
        owner: &Owner,
        amount: Units,
        to_address: &str,
    ) -> Result<Receipt, AppError> {
        validate_amount(amount)?;
        let to_address = to_address.trim();
        if to_address.is_empty() {
            return Err(AppError::EmptyAddress);
        }

        let fee = fee_for(amount, self.config.withdrawal_fee_bps)
            .filter(|fee| amount.checked_add(*fee).is_some())
            .ok_or_else(|| AppError::InvalidAmount("Amount is too large".to_string()))?;

        let wallet = self.owned_wallet(wallet_id, owner.id).await?;
        ensure_active(&wallet)?;

        let mut transaction = Transaction::withdrawal(
            &wallet,
            amount,
            to_address,
            fee,
            self.chain.reference_hash(),
        );

        if !wallet.can_cover(transaction.total_debit()) {
            return Err(AppError::InsufficientBalance {
                balance: wallet.balance,
                required: transaction.total_debit(),
            });
        }

        // The guarded debit re-checks under the write lock
        let new_balance = match self.repo.record_withdrawal(&mut transaction).await? {
            Some(balance) => balance,
            None => {
                let current = self.current_wallet(wallet_id).await?;
                return Err(AppError::InsufficientBalance {
                    balance: current.balance,
                    required: transaction.total_debit(),
                });
            }
        };

        info!(
            wallet_id = %wallet.id,
            transaction_id = %transaction.id,
            amount,
            fee,
            new_balance,
            "withdrawal initiated"
        );
        self.settlements.schedule(&transaction);
        self.notify_transaction(owner, &transaction);

        Ok(Receipt {
            transaction,
            new_balance,
        })
    }

    /// Cancel a pending withdrawal and refund its amount and fee.
    pub async fn cancel_withdrawal(
        &self,
        transaction_id: TransactionId,
        owner_id: UserId,
    ) -> Result<Receipt, AppError> {
        let transaction = self.owned_transaction(transaction_id, owner_id).await?;
        if transaction.kind != TransactionType::Withdrawal {
            return Err(StatusTransitionError {
                from: transaction.status,
                to: TransactionStatus::Cancelled,
            }
            .into());
        }
        transaction.status.transition_to(TransactionStatus::Cancelled)?;

        let new_balance = match self
            .repo
            .reverse_withdrawal(transaction.id, TransactionStatus::Cancelled)
            .await?
        {
            Some(balance) => balance,
            None => {
                // Settled or cancelled in the meantime
                let current = self.owned_transaction(transaction_id, owner_id).await?;
                return Err(StatusTransitionError {
                    from: current.status,
                    to: TransactionStatus::Cancelled,
                }
                .into());
            }
        };
        self.settlements.cancel(transaction.id);

        info!(
            transaction_id = %transaction.id,
            wallet_id = %transaction.wallet_id,
            new_balance,
            "withdrawal cancelled and refunded"
        );

        Ok(Receipt {
            transaction: self.owned_transaction(transaction_id, owner_id).await?,
            new_balance,
        })
    }

    // ========================
    // Transaction queries
    // ========================

    /// Every transaction of the user across wallets, most recent first.
    pub async fn list_user_transactions(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Transaction>, AppError> {
        Ok(self.repo.list_user_transactions(user_id).await?)
    }

    pub async fn get_transaction(
        &self,
        transaction_id: TransactionId,
        owner_id: UserId,
    ) -> Result<Transaction, AppError> {
        self.owned_transaction(transaction_id, owner_id).await
    }

    /// Aggregate statistics over all of the user's transactions.
    pub async fn get_stats(&self, user_id: UserId) -> Result<TransactionStats, AppError> {
        let transactions = self.repo.list_user_transactions(user_id).await?;
        Ok(compute_stats(&transactions))
    }

    /// Compare each wallet's stored balance with its replayed ledger.
    pub async fn verify_balances(
        &self,
        user_id: UserId,
    ) -> Result<Vec<BalanceDiscrepancy>, AppError> {
        let wallets = self.repo.list_user_wallets(user_id, true).await?;
        let transactions = self.repo.list_user_transactions(user_id).await?;

        Ok(wallets
            .into_iter()
            .filter_map(|wallet| {
                let replayed = compute_balance(wallet.id, &transactions);
                (replayed != wallet.balance).then_some(BalanceDiscrepancy {
                    wallet_id: wallet.id,
                    currency: wallet.currency,
                    stored: wallet.balance,
                    replayed,
                })
            })
            .collect())
    }

    // ========================
    // Settlement
    // ========================

    /// Reschedule every pending withdrawal found in storage.
    /// Returns how many timers were started.
    pub async fn resume_pending_settlements(&self) -> Result<usize, AppError> {
        let pending = self.repo.list_pending_withdrawals().await?;
        let scheduled = pending
            .iter()
            .filter(|tx| self.settlements.schedule(tx))
            .count();

        if scheduled > 0 {
            info!(scheduled, "resumed pending settlements");
        }
        Ok(scheduled)
    }

    /// Settle, before returning, every pending withdrawal whose delay has
    /// already passed. Returns how many were settled.
    pub async fn settle_due(&self) -> Result<usize, AppError> {
        let pending = self.repo.list_pending_withdrawals().await?;
        let settled = self.settlements.settle_due(&pending).await;

        if settled > 0 {
            info!(settled, "settled overdue withdrawals");
        }
        Ok(settled)
    }

    /// Wait for every scheduled settlement to finish.
    pub async fn wait_for_settlements(&self) {
        self.settlements.wait_idle().await;
    }

    /// Stop all settlement timers. Pending withdrawals resume on next start.
    pub async fn shutdown(&self) {
        self.settlements.shutdown().await;
    }

    // ========================
    // Helpers
    // ========================

    async fn owned_wallet(&self, wallet_id: WalletId, owner_id: UserId) -> Result<Wallet, AppError> {
        self.repo
            .get_owned_wallet(wallet_id, owner_id)
            .await?
            .ok_or_else(|| AppError::WalletNotFound(wallet_id.to_string()))
    }

    /// Re-read a wallet after a guarded write matched nothing.
    /// Fails if it was deleted or deactivated in the meantime.
    async fn current_wallet(&self, wallet_id: WalletId) -> Result<Wallet, AppError> {
        let wallet = self
            .repo
            .get_wallet(wallet_id)
            .await?
            .ok_or_else(|| AppError::WalletNotFound(wallet_id.to_string()))?;
        ensure_active(&wallet)?;
        Ok(wallet)
    }

    async fn owned_transaction(
        &self,
        transaction_id: TransactionId,
        owner_id: UserId,
    ) -> Result<Transaction, AppError> {
        self.repo
            .get_owned_transaction(transaction_id, owner_id)
            .await?
            .ok_or_else(|| AppError::TransactionNotFound(transaction_id.to_string()))
    }

    fn notify_transaction(&self, owner: &Owner, transaction: &Transaction) {
        dispatch_notification(
            &self.notifier,
            Notification::Transaction {
                email: owner.email.clone(),
                kind: transaction.kind,
                amount: transaction.amount,
                currency: transaction.currency,
            },
        );
    }
}

fn validate_amount(amount: Units) -> Result<(), AppError> {
    if amount <= 0 {
        return Err(AppError::InvalidAmount(
            "Amount must be positive".to_string(),
        ));
    }
    Ok(())
}

fn ensure_active(wallet: &Wallet) -> Result<(), AppError> {
    if !wallet.is_active {
        return Err(AppError::WalletInactive(wallet.id.to_string()));
    }
    Ok(())
}
