// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use cryptovault::application::{CardService, WalletService};
use cryptovault::config::LedgerConfig;
use cryptovault::domain::{Currency, Owner, Transaction, Units, Wallet};
use cryptovault::integrations::{
    Blockchain, Notification, Notifier, SettlementOutcome, SimulatedChain,
};
use cryptovault::storage::Repository;
use tempfile::TempDir;
use uuid::Uuid;

/// One whole coin in base units
pub const COIN: Units = 100_000_000;

/// Config with a settlement delay short enough for tests
pub fn test_config() -> LedgerConfig {
    LedgerConfig::default().with_settlement_delay(Duration::from_millis(50))
}

/// Helper to create a fresh repository in a temporary database
pub async fn test_repository() -> Result<(Repository, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let repo = Repository::init(&format!("sqlite:{}?mode=rwc", db_path.to_str().unwrap())).await?;
    Ok((repo, temp_dir))
}

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(WalletService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = WalletService::init(db_path.to_str().unwrap(), test_config()).await?;
    Ok((service, temp_dir))
}

/// Test service with a custom configuration
pub async fn test_service_with_config(config: LedgerConfig) -> Result<(WalletService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = WalletService::init(db_path.to_str().unwrap(), config).await?;
    Ok((service, temp_dir))
}

/// Wallet service wired to the given test doubles
pub async fn test_service_with(
    chain: Arc<dyn Blockchain>,
    notifier: Arc<dyn Notifier>,
) -> Result<(WalletService, TempDir)> {
    let (repo, temp_dir) = test_repository().await?;
    let service = WalletService::with_integrations(repo, test_config(), chain, notifier);
    Ok((service, temp_dir))
}

/// Card service on a temporary database
pub async fn test_card_service() -> Result<(CardService, TempDir)> {
    let (repo, temp_dir) = test_repository().await?;
    Ok((CardService::new(repo, test_config()), temp_dir))
}

pub fn owner() -> Owner {
    Owner::new(Uuid::new_v4(), "jane@example.com", "Jane", "Doe")
}

/// Create a wallet and fund it with `amount`
pub async fn funded_wallet(
    service: &WalletService,
    owner: &Owner,
    currency: Currency,
    amount: Units,
) -> Result<Wallet> {
    let wallet = service.create_wallet(owner.id, currency).await?;
    service.deposit(wallet.id, owner, amount).await?;
    Ok(wallet)
}

/// Poll until `check` passes or the timeout elapses
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check().await
}

/// Records every notification it receives.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: Notification) -> Result<()> {
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

/// Always fails to deliver.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _notification: Notification) -> Result<()> {
        anyhow::bail!("mail server unreachable")
    }
}

/// Rejects every withdrawal at settlement.
pub struct RejectingChain;

#[async_trait]
impl Blockchain for RejectingChain {
    fn generate_address(&self, currency: Currency) -> String {
        SimulatedChain::new().generate_address(currency)
    }

    fn reference_hash(&self) -> String {
        SimulatedChain::new().reference_hash()
    }

    async fn confirm_withdrawal(&self, _tx: &Transaction) -> Result<SettlementOutcome> {
        Ok(SettlementOutcome::Rejected {
            reason: "insufficient network fee".into(),
        })
    }
}

/// Cannot reach the network: every confirmation attempt errors.
pub struct UnreachableChain;

#[async_trait]
impl Blockchain for UnreachableChain {
    fn generate_address(&self, currency: Currency) -> String {
        SimulatedChain::new().generate_address(currency)
    }

    fn reference_hash(&self) -> String {
        SimulatedChain::new().reference_hash()
    }

    async fn confirm_withdrawal(&self, _tx: &Transaction) -> Result<SettlementOutcome> {
        anyhow::bail!("connection refused")
    }
}

/// Hands out the same address for the first `repeats` calls, then fresh ones.
pub struct CollidingChain {
    address: String,
    repeats: usize,
    calls: AtomicUsize,
}

impl CollidingChain {
    pub fn new(address: impl Into<String>, repeats: usize) -> Self {
        Self {
            address: address.into(),
            repeats,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Blockchain for CollidingChain {
    fn generate_address(&self, currency: Currency) -> String {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.repeats {
            self.address.clone()
        } else {
            SimulatedChain::new().generate_address(currency)
        }
    }

    fn reference_hash(&self) -> String {
        SimulatedChain::new().reference_hash()
    }

    async fn confirm_withdrawal(&self, _tx: &Transaction) -> Result<SettlementOutcome> {
        Ok(SettlementOutcome::Confirmed)
    }
}
