use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::{AppError, CardService, WalletService};
use crate::config::LedgerConfig;
use crate::domain::{
    Card, CardType, Currency, Owner, Transaction, format_cents, format_units, parse_cents,
    parse_units,
};

/// CryptoVault - Crypto Wallet Ledger
#[derive(Parser)]
#[command(name = "cryptovault")]
#[command(about = "A local-first crypto wallet ledger with virtual cards")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "CRYPTOVAULT_DB", default_value = "cryptovault.db")]
    pub database: String,

    /// Acting user id
    #[arg(long, env = "CRYPTOVAULT_USER", global = true)]
    pub user: Option<Uuid>,

    /// Acting user's email, used for notifications
    #[arg(long, env = "CRYPTOVAULT_EMAIL", global = true, default_value = "owner@localhost")]
    pub email: String,

    #[arg(long, env = "CRYPTOVAULT_FIRST_NAME", global = true, default_value = "")]
    pub first_name: String,

    #[arg(long, env = "CRYPTOVAULT_LAST_NAME", global = true, default_value = "")]
    pub last_name: String,

    /// Delay before a withdrawal is confirmed, in milliseconds
    #[arg(long, env = "CRYPTOVAULT_SETTLEMENT_DELAY_MS", default_value_t = 3000)]
    pub settlement_delay_ms: u64,

    /// Withdrawal fee in basis points (at most 10000)
    #[arg(
        long,
        env = "CRYPTOVAULT_FEE_BPS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u32).range(0..=10_000)
    )]
    pub fee_bps: u32,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Wallet management commands
    #[command(subcommand)]
    Wallet(WalletCommands),

    /// Deposit into a wallet
    Deposit {
        /// Wallet ID
        wallet: Uuid,

        /// Amount to deposit (e.g., "1.5" or "0.00000001")
        amount: String,
    },

    /// Withdraw from a wallet to an external address
    Withdraw {
        /// Wallet ID
        wallet: Uuid,

        /// Amount to withdraw, before fee
        amount: String,

        /// Destination address
        #[arg(long)]
        to: String,

        /// Wait for settlement before exiting
        #[arg(long)]
        wait: bool,
    },

    /// Cancel a pending withdrawal and refund it
    Cancel {
        /// Transaction ID
        id: Uuid,
    },

    /// List transactions, most recent first
    Transactions {
        /// Only show one wallet
        #[arg(long)]
        wallet: Option<Uuid>,
    },

    /// Show a single transaction
    Transaction {
        /// Transaction ID
        id: Uuid,
    },

    /// Show transaction statistics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Settle every pending withdrawal that is due and wait for them
    Settle,

    /// Verify stored balances against the ledger
    Check,

    /// Card management commands
    #[command(subcommand)]
    Card(CardCommands),
}

#[derive(Subcommand)]
pub enum WalletCommands {
    /// Create a wallet for a currency
    Create {
        /// Currency (BTC, ETH, USDT, USDC, BNB)
        currency: String,
    },

    /// List active wallets
    List,

    /// Show wallet details and its transactions
    Show {
        /// Wallet ID
        id: Uuid,
    },

    /// Deactivate a wallet (history is kept)
    Deactivate {
        /// Wallet ID
        id: Uuid,
    },

    /// Delete a wallet and its transactions
    Delete {
        /// Wallet ID
        id: Uuid,
    },
}

#[derive(Subcommand)]
pub enum CardCommands {
    /// Issue a new card
    Issue {
        /// Card type: virtual, physical
        #[arg(short = 't', long = "type", default_value = "virtual")]
        card_type: String,

        /// Spending limit (e.g., "1000.00")
        #[arg(short, long)]
        limit: String,
    },

    /// List cards
    List,

    /// Show card details
    Show {
        /// Card ID
        id: Uuid,
    },

    /// Change a card's spending limit
    Limit {
        /// Card ID
        id: Uuid,

        /// New spending limit
        limit: String,
    },

    /// Activate a card
    Activate {
        /// Card ID
        id: Uuid,
    },

    /// Block a card permanently
    Block {
        /// Card ID
        id: Uuid,
    },

    /// Record spending on a card
    Spend {
        /// Card ID
        id: Uuid,

        /// Amount spent
        amount: String,
    },

    /// Delete a card
    Remove {
        /// Card ID
        id: Uuid,
    },
}

impl Cli {
    fn config(&self) -> LedgerConfig {
        LedgerConfig::default()
            .with_settlement_delay(Duration::from_millis(self.settlement_delay_ms))
            .with_withdrawal_fee_bps(self.fee_bps)
    }

    fn owner(&self) -> Result<Owner> {
        let id = self
            .user
            .context("No user given. Pass --user or set CRYPTOVAULT_USER")?;
        Ok(Owner::new(
            id,
            self.email.clone(),
            self.first_name.clone(),
            self.last_name.clone(),
        ))
    }

    async fn catch_up_settlements(&self, service: &WalletService) -> Result<()> {
        // Overdue withdrawals settle before the command sees them
        let settled = service.settle_due().await?;
        let resumed = service.resume_pending_settlements().await?;

        if self.verbose && settled > 0 {
            eprintln!("[Settlement] Settled {} overdue withdrawal(s)", settled);
        }
        if self.verbose && resumed > 0 {
            eprintln!("[Settlement] Resumed {} pending withdrawal(s)", resumed);
        }
        Ok(())
    }

    pub async fn run(self) -> Result<()> {
        let config = self.config();

        if matches!(self.command, Commands::Init) {
            WalletService::init(&self.database, config).await?;
            println!("Database initialized: {}", self.database);
            return Ok(());
        }

        let owner = self.owner()?;
        let service = WalletService::connect(&self.database, config.clone()).await?;
        self.catch_up_settlements(&service).await?;

        let result = run_command(&service, &owner, config, self.command).await;

        if matches!(result, Ok(true)) {
            service.wait_for_settlements().await;
        }
        service.shutdown().await;
        service.repository().close().await;
        result.map(|_| ())
    }
}

/// Dispatch one command. Returns true if the caller should wait for
/// settlements before exiting.
async fn run_command(
    service: &WalletService,
    owner: &Owner,
    config: LedgerConfig,
    command: Commands,
) -> Result<bool> {
    match command {
        Commands::Init => {}

        Commands::Wallet(wallet_cmd) => run_wallet_command(service, owner, wallet_cmd).await?,

        Commands::Deposit { wallet, amount } => {
            run_deposit_command(service, owner, wallet, &amount).await?
        }

        Commands::Withdraw {
            wallet,
            amount,
            to,
            wait,
        } => {
            run_withdraw_command(service, owner, wallet, &amount, &to).await?;
            return Ok(wait);
        }

        Commands::Cancel { id } => {
            let receipt = service.cancel_withdrawal(id, owner.id).await?;
            println!(
                "Cancelled withdrawal {}: refunded {} {}",
                receipt.transaction.id,
                format_units(receipt.transaction.total_debit()),
                receipt.transaction.currency
            );
            println!("New balance: {}", format_units(receipt.new_balance));
        }

        Commands::Transactions { wallet } => {
            run_transactions_command(service, owner, wallet).await?
        }

        Commands::Transaction { id } => {
            let transaction = service.get_transaction(id, owner.id).await?;
            print_transaction(&transaction);
        }

        Commands::Stats { json } => run_stats_command(service, owner, json).await?,

        Commands::Settle => {
            let pending = service.settlements().scheduled_count();
            println!("Settling {} pending withdrawal(s)...", pending);
            return Ok(true);
        }

        Commands::Check => run_check_command(service, owner).await?,

        Commands::Card(card_cmd) => {
            let cards = CardService::new(service.repository().clone(), config);
            run_card_command(&cards, owner, card_cmd).await?
        }
    }

    Ok(false)
}

async fn run_wallet_command(
    service: &WalletService,
    owner: &Owner,
    cmd: WalletCommands,
) -> Result<()> {
    match cmd {
        WalletCommands::Create { currency } => {
            let currency: Currency = currency.parse().map_err(AppError::from)?;
            let wallet = service.create_wallet(owner.id, currency).await?;
            println!("Created {} wallet: {}", wallet.currency, wallet.id);
            println!("  Address: {}", wallet.address);
        }

        WalletCommands::List => {
            let wallets = service.get_user_wallets(owner.id).await?;
            if wallets.is_empty() {
                println!("No wallets found.");
            } else {
                println!(
                    "{:<38} {:<6} {:>20} {:>6}",
                    "ID", "COIN", "BALANCE", "TXS"
                );
                println!("{}", "-".repeat(73));
                for entry in wallets {
                    println!(
                        "{:<38} {:<6} {:>20} {:>6}",
                        entry.wallet.id,
                        entry.wallet.currency,
                        format_units(entry.wallet.balance),
                        entry.transactions.len()
                    );
                }
            }
        }

        WalletCommands::Show { id } => {
            let info = service.get_wallet_by_id(id, owner.id).await?;
            let wallet = &info.wallet;

            println!("Wallet: {}", wallet.id);
            println!("  Currency: {}", wallet.currency);
            println!("  Address:  {}", wallet.address);
            println!(
                "  Balance:  {} {}",
                format_units(wallet.balance),
                wallet.currency
            );
            println!("  Active:   {}", if wallet.is_active { "yes" } else { "no" });
            println!(
                "  Created:  {}",
                wallet.created_at.format("%Y-%m-%d %H:%M:%S")
            );

            if !info.transactions.is_empty() {
                println!();
                print_transaction_table(&info.transactions);
            }
        }

        WalletCommands::Deactivate { id } => {
            let wallet = service.deactivate_wallet(id, owner.id).await?;
            println!("Deactivated {} wallet: {}", wallet.currency, wallet.id);
        }

        WalletCommands::Delete { id } => {
            let wallet = service.delete_wallet(id, owner.id).await?;
            println!("Deleted {} wallet: {}", wallet.currency, wallet.id);
        }
    }
    Ok(())
}

async fn run_deposit_command(
    service: &WalletService,
    owner: &Owner,
    wallet_id: Uuid,
    amount: &str,
) -> Result<()> {
    let amount = parse_units(amount).map_err(AppError::from)?;
    let receipt = service.deposit(wallet_id, owner, amount).await?;

    println!(
        "Deposited {} {} ({})",
        format_units(receipt.transaction.amount),
        receipt.transaction.currency,
        receipt.transaction.id
    );
    println!("New balance: {}", format_units(receipt.new_balance));
    Ok(())
}

async fn run_withdraw_command(
    service: &WalletService,
    owner: &Owner,
    wallet_id: Uuid,
    amount: &str,
    to_address: &str,
) -> Result<()> {
    let amount = parse_units(amount).map_err(AppError::from)?;
    let receipt = service
        .withdraw(wallet_id, owner, amount, to_address)
        .await?;
    let tx = &receipt.transaction;

    println!(
        "Withdrawal of {} {} to {} is {} ({})",
        format_units(tx.amount),
        tx.currency,
        to_address.trim(),
        tx.status,
        tx.id
    );
    println!("  Fee:         {}", format_units(tx.fee));
    println!("  New balance: {}", format_units(receipt.new_balance));
    Ok(())
}

async fn run_transactions_command(
    service: &WalletService,
    owner: &Owner,
    wallet: Option<Uuid>,
) -> Result<()> {
    let transactions = match wallet {
        Some(wallet_id) => service.get_wallet_transactions(wallet_id, owner.id).await?,
        None => service.list_user_transactions(owner.id).await?,
    };

    if transactions.is_empty() {
        println!("No transactions found.");
    } else {
        print_transaction_table(&transactions);
    }
    Ok(())
}

async fn run_stats_command(service: &WalletService, owner: &Owner, json: bool) -> Result<()> {
    let stats = service.get_stats(owner.id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Transactions: {}", stats.total_transactions);
    println!("  Pending:    {}", stats.pending_count);
    println!("  Completed:  {}", stats.completed_count);
    println!("  Failed:     {}", stats.failed_count);
    println!();
    println!("Deposits:     {}", format_units(stats.total_deposits));
    println!("Withdrawals:  {}", format_units(stats.total_withdrawals));

    if !stats.by_currency.is_empty() {
        println!();
        println!(
            "{:<6} {:>20} {:>20} {:>14}",
            "COIN", "DEPOSITS", "WITHDRAWALS", "FEES"
        );
        println!("{}", "-".repeat(63));
        for (currency, totals) in &stats.by_currency {
            println!(
                "{:<6} {:>20} {:>20} {:>14}",
                currency,
                format_units(totals.deposits),
                format_units(totals.withdrawals),
                format_units(totals.fees)
            );
        }
    }
    Ok(())
}

async fn run_check_command(service: &WalletService, owner: &Owner) -> Result<()> {
    println!("Checking wallet balances...\n");

    let discrepancies = service.verify_balances(owner.id).await?;

    if discrepancies.is_empty() {
        println!("All balances match the ledger.");
        return Ok(());
    }

    println!("Issues found:");
    for issue in &discrepancies {
        println!(
            "  - {} wallet {}: stored {}, ledger {}",
            issue.currency,
            issue.wallet_id,
            format_units(issue.stored),
            format_units(issue.replayed)
        );
    }
    anyhow::bail!("Balance check failed for {} wallet(s)", discrepancies.len());
}

async fn run_card_command(cards: &CardService, owner: &Owner, cmd: CardCommands) -> Result<()> {
    match cmd {
        CardCommands::Issue { card_type, limit } => {
            let card_type = CardType::from_str(&card_type)
                .ok_or_else(|| AppError::InvalidCardType(card_type.clone()))?;
            let limit = parse_cents(&limit).map_err(AppError::from)?;

            let card = cards.issue_card(owner, card_type, limit).await?;
            println!("Issued {} card {} ({})", card.card_type, card.masked_number(), card.id);
        }

        CardCommands::List => {
            let list = cards.list_cards(owner.id).await?;
            if list.is_empty() {
                println!("No cards found.");
            } else {
                println!(
                    "{:<38} {:<20} {:<9} {:<10} {:>12} {:>12}",
                    "ID", "NUMBER", "TYPE", "STATUS", "SPENT", "LIMIT"
                );
                println!("{}", "-".repeat(106));
                for card in list {
                    println!(
                        "{:<38} {:<20} {:<9} {:<10} {:>12} {:>12}",
                        card.id,
                        card.masked_number(),
                        card.card_type,
                        card.status,
                        format_cents(card.current_spending),
                        format_cents(card.spending_limit)
                    );
                }
            }
        }

        CardCommands::Show { id } => {
            let card = cards.get_card(id, owner.id).await?;
            print_card(&card);
        }

        CardCommands::Limit { id, limit } => {
            let limit = parse_cents(&limit).map_err(AppError::from)?;
            let card = cards.update_spending_limit(id, owner.id, limit).await?;
            println!(
                "Spending limit of {} set to {} {}",
                card.masked_number(),
                format_cents(card.spending_limit),
                card.currency
            );
        }

        CardCommands::Activate { id } => {
            let card = cards.activate(id, owner.id).await?;
            println!("Activated card {}", card.masked_number());
        }

        CardCommands::Block { id } => {
            let card = cards.block(id, owner.id).await?;
            println!("Blocked card {}", card.masked_number());
        }

        CardCommands::Spend { id, amount } => {
            let amount = parse_cents(&amount).map_err(AppError::from)?;
            let card = cards.record_spending(id, owner.id, amount).await?;
            println!(
                "Recorded {} {} on {} ({} remaining)",
                format_cents(amount),
                card.currency,
                card.masked_number(),
                format_cents(card.remaining())
            );
        }

        CardCommands::Remove { id } => {
            let card = cards.remove(id, owner.id).await?;
            println!("Removed card {}", card.masked_number());
        }
    }
    Ok(())
}

fn print_transaction_table(transactions: &[Transaction]) {
    println!(
        "{:<20} {:<13} {:<10} {:>20} {:<6} ID",
        "DATE", "TYPE", "STATUS", "AMOUNT", "COIN"
    );
    println!("{}", "-".repeat(110));

    for tx in transactions {
        println!(
            "{:<20} {:<13} {:<10} {:>20} {:<6} {}",
            tx.created_at.format("%Y-%m-%d %H:%M:%S"),
            tx.kind,
            tx.status,
            format_units(tx.amount),
            tx.currency,
            tx.id
        );
    }
}

fn print_transaction(tx: &Transaction) {
    println!("Transaction: {}", tx.id);
    println!("  Sequence:    {}", tx.sequence);
    println!("  Wallet:      {}", tx.wallet_id);
    println!("  Type:        {}", tx.kind);
    println!("  Status:      {}", tx.status);
    println!("  Amount:      {} {}", format_units(tx.amount), tx.currency);
    if tx.fee > 0 {
        println!("  Fee:         {} {}", format_units(tx.fee), tx.currency);
    }
    if let Some(from) = &tx.from_address {
        println!("  From:        {}", from);
    }
    if let Some(to) = &tx.to_address {
        println!("  To:          {}", to);
    }
    if let Some(hash) = &tx.tx_hash {
        println!("  Hash:        {}", truncate(hash, 24));
    }
    if let Some(desc) = &tx.description {
        println!("  Description: {}", desc);
    }
    println!(
        "  Created:     {}",
        tx.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!(
        "  Updated:     {}",
        tx.updated_at.format("%Y-%m-%d %H:%M:%S")
    );
}

fn print_card(card: &Card) {
    println!("Card: {}", card.id);
    println!("  Number:   {}", card.masked_number());
    println!("  Holder:   {}", card.card_holder_name);
    println!("  Type:     {}", card.card_type);
    println!("  Status:   {}", card.status);
    println!("  Expires:  {}", card.expiry_date.format("%m/%y"));
    println!(
        "  Spending: {} of {} {}",
        format_cents(card.current_spending),
        format_cents(card.spending_limit),
        card.currency
    );
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len - 3])
    }
}
