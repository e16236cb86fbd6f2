use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    Card, CardId, CardStatus, CardType, Cents, Currency, Transaction, TransactionId,
    TransactionStatus, TransactionType, Units, UserId, Wallet, WalletId,
};

use super::{MIGRATION_001_WALLETS, MIGRATION_002_CARDS};

const TRANSACTION_COLUMNS: &str = "t.id, t.sequence, t.wallet_id, t.kind, t.status, t.amount, t.currency, t.from_address, t.to_address, t.tx_hash, t.description, t.fee, t.created_at, t.updated_at";

const WALLET_COLUMNS: &str =
    "id, user_id, currency, balance, address, is_active, created_at, updated_at";

const CARD_COLUMNS: &str = "id, user_id, card_number, card_holder_name, card_type, status, expiry_date, spending_limit, current_spending, currency, created_at, updated_at";

/// Outcome of inserting a wallet, distinguishing the two uniqueness rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletInsert {
    Inserted,
    /// Another wallet already uses the generated deposit address
    AddressTaken,
    /// The user already has a wallet in this currency
    CurrencyTaken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardInsert {
    Inserted,
    NumberTaken,
}

/// Repository for persisting and querying wallets, ledger entries and cards.
///
/// Every multi-row write runs in a single SQLite transaction whose first
/// statement is the guarded write, so concurrent writers serialize on the
/// database lock instead of racing on stale reads.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(10))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_WALLETS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        sqlx::query(MIGRATION_002_CARDS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 002")?;

        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ========================
    // Wallet operations
    // ========================

    /// Save a new wallet. Uniqueness violations are reported, not raised.
    pub async fn save_wallet(&self, wallet: &Wallet) -> Result<WalletInsert> {
        let result = sqlx::query(
            r#"
            INSERT INTO wallets (id, user_id, currency, balance, address, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(wallet.id.to_string())
        .bind(wallet.user_id.to_string())
        .bind(wallet.currency.as_str())
        .bind(wallet.balance)
        .bind(&wallet.address)
        .bind(wallet.is_active)
        .bind(timestamp(wallet.created_at))
        .bind(timestamp(wallet.updated_at))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(WalletInsert::Inserted),
            Err(err) => match unique_violation(&err) {
                Some(message) if message.contains("wallets.address") => {
                    Ok(WalletInsert::AddressTaken)
                }
                Some(message) if message.contains("wallets.user_id") => {
                    Ok(WalletInsert::CurrencyTaken)
                }
                _ => Err(anyhow::Error::new(err).context("Failed to save wallet")),
            },
        }
    }

    /// Get a wallet by ID.
    pub async fn get_wallet(&self, id: WalletId) -> Result<Option<Wallet>> {
        let row = sqlx::query(&format!("SELECT {} FROM wallets WHERE id = ?", WALLET_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch wallet")?;

        row.as_ref().map(Self::row_to_wallet).transpose()
    }

    /// Get a wallet by ID only if it belongs to `user_id`.
    pub async fn get_owned_wallet(&self, id: WalletId, user_id: UserId) -> Result<Option<Wallet>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM wallets WHERE id = ? AND user_id = ?",
            WALLET_COLUMNS
        ))
        .bind(id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch wallet")?;

        row.as_ref().map(Self::row_to_wallet).transpose()
    }

    /// Find the user's wallet for a currency, active or not.
    pub async fn find_wallet(&self, user_id: UserId, currency: Currency) -> Result<Option<Wallet>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM wallets WHERE user_id = ? AND currency = ?",
            WALLET_COLUMNS
        ))
        .bind(user_id.to_string())
        .bind(currency.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch wallet by currency")?;

        row.as_ref().map(Self::row_to_wallet).transpose()
    }

    /// List a user's wallets, most recently created first.
    pub async fn list_user_wallets(
        &self,
        user_id: UserId,
        include_inactive: bool,
    ) -> Result<Vec<Wallet>> {
        let filter = if include_inactive {
            ""
        } else {
            " AND is_active = 1"
        };
        let rows = sqlx::query(&format!(
            "SELECT {} FROM wallets WHERE user_id = ?{} ORDER BY created_at DESC, rowid DESC",
            WALLET_COLUMNS, filter
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list wallets")?;

        rows.iter().map(Self::row_to_wallet).collect()
    }

    /// Soft-disable a wallet. Returns false if no row changed.
    pub async fn deactivate_wallet(&self, id: WalletId) -> Result<bool> {
        let result =
            sqlx::query("UPDATE wallets SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1")
                .bind(timestamp(Utc::now()))
                .bind(id.to_string())
                .execute(&self.pool)
                .await
                .context("Failed to deactivate wallet")?;
        Ok(result.rows_affected() == 1)
    }

    /// Hard-delete a wallet; its transactions go with it.
    pub async fn delete_wallet(&self, id: WalletId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM wallets WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete wallet")?;
        Ok(result.rows_affected() == 1)
    }

    fn row_to_wallet(row: &SqliteRow) -> Result<Wallet> {
        let id_str: String = row.get("id");
        let user_id_str: String = row.get("user_id");
        let currency_str: String = row.get("currency");

        Ok(Wallet {
            id: Uuid::parse_str(&id_str).context("Invalid wallet ID")?,
            user_id: Uuid::parse_str(&user_id_str).context("Invalid user ID")?,
            currency: Currency::from_str(&currency_str).context("Invalid wallet currency")?,
            balance: row.get("balance"),
            address: row.get("address"),
            is_active: row.get::<i32, _>("is_active") != 0,
            created_at: parse_timestamp(row.get("created_at"))
                .context("Invalid created_at timestamp")?,
            updated_at: parse_timestamp(row.get("updated_at"))
                .context("Invalid updated_at timestamp")?,
        })
    }

    // ========================
    // Ledger operations
    // ========================

    /// Credit a completed deposit and record its ledger entry atomically.
    /// Returns the new balance, or None if the wallet is gone, inactive, or
    /// the credit would overflow.
    pub async fn record_deposit(&self, tx: &mut Transaction) -> Result<Option<Units>> {
        let mut db = self.pool.begin().await.context("Failed to begin deposit")?;

        let row = sqlx::query(
            r#"
            UPDATE wallets
            SET balance = balance + ?, updated_at = ?
            WHERE id = ? AND is_active = 1 AND balance <= ?
            RETURNING balance
            "#,
        )
        .bind(tx.amount)
        .bind(timestamp(tx.created_at))
        .bind(tx.wallet_id.to_string())
        .bind(Units::MAX - tx.amount)
        .fetch_optional(&mut *db)
        .await
        .context("Failed to credit wallet")?;

        let Some(row) = row else {
            return Ok(None);
        };

        tx.sequence = Self::next_sequence(&mut *db).await?;
        Self::insert_transaction(&mut *db, tx).await?;
        db.commit().await.context("Failed to commit deposit")?;

        Ok(Some(row.get("balance")))
    }

    /// Debit `amount + fee` and record the pending withdrawal atomically.
    /// Returns None without writing anything if the wallet is inactive or
    /// its balance cannot cover it.
    pub async fn record_withdrawal(&self, tx: &mut Transaction) -> Result<Option<Units>> {
        let total = tx.total_debit();
        let mut db = self
            .pool
            .begin()
            .await
            .context("Failed to begin withdrawal")?;

        let row = sqlx::query(
            r#"
            UPDATE wallets
            SET balance = balance - ?, updated_at = ?
            WHERE id = ? AND is_active = 1 AND balance >= ?
            RETURNING balance
            "#,
        )
        .bind(total)
        .bind(timestamp(tx.created_at))
        .bind(tx.wallet_id.to_string())
        .bind(total)
        .fetch_optional(&mut *db)
        .await
        .context("Failed to debit wallet")?;

        let Some(row) = row else {
            return Ok(None);
        };

        tx.sequence = Self::next_sequence(&mut *db).await?;
        Self::insert_transaction(&mut *db, tx).await?;
        db.commit().await.context("Failed to commit withdrawal")?;

        Ok(Some(row.get("balance")))
    }

    /// Move a pending transaction to `completed`. No balance change.
    /// Returns false if it was not pending anymore.
    pub async fn complete_transaction(&self, id: TransactionId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE transactions SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(TransactionStatus::Completed.as_str())
        .bind(timestamp(Utc::now()))
        .bind(id.to_string())
        .bind(TransactionStatus::Pending.as_str())
        .execute(&self.pool)
        .await
        .context("Failed to complete transaction")?;
        Ok(result.rows_affected() == 1)
    }

    /// Close a pending withdrawal as `failed` or `cancelled` and refund
    /// `amount + fee` to its wallet, atomically.
    /// Returns the wallet's new balance, or None if it was not pending.
    pub async fn reverse_withdrawal(
        &self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<Option<Units>> {
        let now = timestamp(Utc::now());
        let mut db = self
            .pool
            .begin()
            .await
            .context("Failed to begin withdrawal reversal")?;

        let row = sqlx::query(
            r#"
            UPDATE transactions
            SET status = ?, updated_at = ?
            WHERE id = ? AND status = ? AND kind = ?
            RETURNING wallet_id, amount, fee
            "#,
        )
        .bind(status.as_str())
        .bind(&now)
        .bind(id.to_string())
        .bind(TransactionStatus::Pending.as_str())
        .bind(TransactionType::Withdrawal.as_str())
        .fetch_optional(&mut *db)
        .await
        .context("Failed to close withdrawal")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let wallet_id: String = row.get("wallet_id");
        let refund: Units = row.get::<i64, _>("amount") + row.get::<i64, _>("fee");

        let balance: Units = sqlx::query(
            "UPDATE wallets SET balance = balance + ?, updated_at = ? WHERE id = ? RETURNING balance",
        )
        .bind(refund)
        .bind(&now)
        .bind(&wallet_id)
        .fetch_one(&mut *db)
        .await
        .context("Failed to refund wallet")?
        .get("balance");

        db.commit()
            .await
            .context("Failed to commit withdrawal reversal")?;
        Ok(Some(balance))
    }

    /// Get the next sequence number and increment the counter.
    async fn next_sequence(conn: &mut SqliteConnection) -> Result<i64> {
        let row = sqlx::query(
            r#"
            UPDATE sequence_counter
            SET value = value + 1
            WHERE name = 'transaction_sequence'
            RETURNING value
            "#,
        )
        .fetch_one(&mut *conn)
        .await
        .context("Failed to get next sequence number")?;

        Ok(row.get("value"))
    }

    async fn insert_transaction(conn: &mut SqliteConnection, tx: &Transaction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (id, sequence, wallet_id, kind, status, amount, currency, from_address, to_address, tx_hash, description, fee, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(tx.id.to_string())
        .bind(tx.sequence)
        .bind(tx.wallet_id.to_string())
        .bind(tx.kind.as_str())
        .bind(tx.status.as_str())
        .bind(tx.amount)
        .bind(tx.currency.as_str())
        .bind(&tx.from_address)
        .bind(&tx.to_address)
        .bind(&tx.tx_hash)
        .bind(&tx.description)
        .bind(tx.fee)
        .bind(timestamp(tx.created_at))
        .bind(timestamp(tx.updated_at))
        .execute(&mut *conn)
        .await
        .context("Failed to save transaction")?;
        Ok(())
    }

    /// Get a transaction only if its wallet belongs to `user_id`.
    pub async fn get_owned_transaction(
        &self,
        id: TransactionId,
        user_id: UserId,
    ) -> Result<Option<Transaction>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM transactions t
            JOIN wallets w ON w.id = t.wallet_id
            WHERE t.id = ? AND w.user_id = ?
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch transaction")?;

        row.as_ref().map(Self::row_to_transaction).transpose()
    }

    /// List a wallet's transactions, most recent first.
    pub async fn list_wallet_transactions(&self, wallet_id: WalletId) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM transactions t WHERE t.wallet_id = ? ORDER BY t.sequence DESC",
            TRANSACTION_COLUMNS
        ))
        .bind(wallet_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list wallet transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// List every transaction across the user's wallets, most recent first.
    pub async fn list_user_transactions(&self, user_id: UserId) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM transactions t
            JOIN wallets w ON w.id = t.wallet_id
            WHERE w.user_id = ?
            ORDER BY t.sequence DESC
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list user transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// List every withdrawal still awaiting settlement, oldest first.
    pub async fn list_pending_withdrawals(&self) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM transactions t WHERE t.status = ? AND t.kind = ? ORDER BY t.sequence",
            TRANSACTION_COLUMNS
        ))
        .bind(TransactionStatus::Pending.as_str())
        .bind(TransactionType::Withdrawal.as_str())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list pending withdrawals")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
        let id_str: String = row.get("id");
        let wallet_id_str: String = row.get("wallet_id");
        let kind_str: String = row.get("kind");
        let status_str: String = row.get("status");
        let currency_str: String = row.get("currency");

        Ok(Transaction {
            id: Uuid::parse_str(&id_str).context("Invalid transaction ID")?,
            sequence: row.get("sequence"),
            wallet_id: Uuid::parse_str(&wallet_id_str).context("Invalid wallet ID")?,
            kind: TransactionType::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction type: {}", kind_str))?,
            status: TransactionStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction status: {}", status_str))?,
            amount: row.get("amount"),
            currency: Currency::from_str(&currency_str)
                .context("Invalid transaction currency")?,
            from_address: row.get("from_address"),
            to_address: row.get("to_address"),
            tx_hash: row.get("tx_hash"),
            description: row.get("description"),
            fee: row.get("fee"),
            created_at: parse_timestamp(row.get("created_at"))
                .context("Invalid created_at timestamp")?,
            updated_at: parse_timestamp(row.get("updated_at"))
                .context("Invalid updated_at timestamp")?,
        })
    }

    // ========================
    // Card operations
    // ========================

    /// Save a new card. A card number collision is reported, not raised.
    pub async fn save_card(&self, card: &Card) -> Result<CardInsert> {
        let result = sqlx::query(
            r#"
            INSERT INTO cards (id, user_id, card_number, card_holder_name, card_type, status, expiry_date, spending_limit, current_spending, currency, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(card.id.to_string())
        .bind(card.user_id.to_string())
        .bind(&card.card_number)
        .bind(&card.card_holder_name)
        .bind(card.card_type.as_str())
        .bind(card.status.as_str())
        .bind(card.expiry_date.to_string())
        .bind(card.spending_limit)
        .bind(card.current_spending)
        .bind(&card.currency)
        .bind(timestamp(card.created_at))
        .bind(timestamp(card.updated_at))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(CardInsert::Inserted),
            Err(err) => match unique_violation(&err) {
                Some(message) if message.contains("cards.card_number") => {
                    Ok(CardInsert::NumberTaken)
                }
                _ => Err(anyhow::Error::new(err).context("Failed to save card")),
            },
        }
    }

    /// Get a card only if it belongs to `user_id`.
    pub async fn get_owned_card(&self, id: CardId, user_id: UserId) -> Result<Option<Card>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM cards WHERE id = ? AND user_id = ?",
            CARD_COLUMNS
        ))
        .bind(id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch card")?;

        row.as_ref().map(Self::row_to_card).transpose()
    }

    /// List a user's cards, most recently issued first.
    pub async fn list_user_cards(&self, user_id: UserId) -> Result<Vec<Card>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM cards WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
            CARD_COLUMNS
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list cards")?;

        rows.iter().map(Self::row_to_card).collect()
    }

    /// Set a new spending limit unless it would sit below current spending.
    /// Returns false if the guard rejected the update.
    pub async fn update_spending_limit(
        &self,
        id: CardId,
        user_id: UserId,
        limit: Cents,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE cards
            SET spending_limit = ?, updated_at = ?
            WHERE id = ? AND user_id = ? AND current_spending <= ?
            "#,
        )
        .bind(limit)
        .bind(timestamp(Utc::now()))
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(limit)
        .execute(&self.pool)
        .await
        .context("Failed to update spending limit")?;
        Ok(result.rows_affected() == 1)
    }

    /// Compare-and-set a card's status.
    /// Returns false if the card was no longer in `from`.
    pub async fn set_card_status(&self, id: CardId, from: CardStatus, to: CardStatus) -> Result<bool> {
        let result =
            sqlx::query("UPDATE cards SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
                .bind(to.as_str())
                .bind(timestamp(Utc::now()))
                .bind(id.to_string())
                .bind(from.as_str())
                .execute(&self.pool)
                .await
                .context("Failed to update card status")?;
        Ok(result.rows_affected() == 1)
    }

    /// Add to an active card's running spend if it stays within the limit.
    /// Returns the new spending total, or None if the guard rejected it.
    pub async fn add_card_spending(
        &self,
        id: CardId,
        user_id: UserId,
        amount: Cents,
    ) -> Result<Option<Cents>> {
        let row = sqlx::query(
            r#"
            UPDATE cards
            SET current_spending = current_spending + ?, updated_at = ?
            WHERE id = ? AND user_id = ? AND status = ? AND current_spending + ? <= spending_limit
            RETURNING current_spending
            "#,
        )
        .bind(amount)
        .bind(timestamp(Utc::now()))
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(CardStatus::Active.as_str())
        .bind(amount)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to record card spending")?;

        Ok(row.map(|row| row.get("current_spending")))
    }

    pub async fn delete_card(&self, id: CardId, user_id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cards WHERE id = ? AND user_id = ?")
            .bind(id.to_string())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete card")?;
        Ok(result.rows_affected() == 1)
    }

    fn row_to_card(row: &SqliteRow) -> Result<Card> {
        let id_str: String = row.get("id");
        let user_id_str: String = row.get("user_id");
        let card_type_str: String = row.get("card_type");
        let status_str: String = row.get("status");
        let expiry_str: String = row.get("expiry_date");

        Ok(Card {
            id: Uuid::parse_str(&id_str).context("Invalid card ID")?,
            user_id: Uuid::parse_str(&user_id_str).context("Invalid user ID")?,
            card_number: row.get("card_number"),
            card_holder_name: row.get("card_holder_name"),
            card_type: CardType::from_str(&card_type_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid card type: {}", card_type_str))?,
            status: CardStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid card status: {}", status_str))?,
            expiry_date: NaiveDate::parse_from_str(&expiry_str, "%Y-%m-%d")
                .context("Invalid expiry date")?,
            spending_limit: row.get("spending_limit"),
            current_spending: row.get("current_spending"),
            currency: row.get("currency"),
            created_at: parse_timestamp(row.get("created_at"))
                .context("Invalid created_at timestamp")?,
            updated_at: parse_timestamp(row.get("updated_at"))
                .context("Invalid updated_at timestamp")?,
        })
    }
}

fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: String) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(&value)?.with_timezone(&Utc))
}

/// The database message of a UNIQUE constraint failure, if that is what `err` is.
fn unique_violation(err: &sqlx::Error) -> Option<String> {
    err.as_database_error()
        .filter(|db_err| db_err.is_unique_violation())
        .map(|db_err| db_err.message().to_string())
}
