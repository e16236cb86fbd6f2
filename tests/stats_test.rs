mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use common::*;
use cryptovault::application::WalletService;
use cryptovault::domain::{Currency, TransactionStatus, TransactionType};
use cryptovault::integrations::LogNotifier;
use uuid::Uuid;

#[tokio::test]
async fn test_stats_over_all_user_wallets() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let owner = owner();

    let btc = funded_wallet(&service, &owner, Currency::Btc, 2 * COIN).await?;
    let eth = funded_wallet(&service, &owner, Currency::Eth, 5 * COIN).await?;
    service.withdraw(btc.id, &owner, COIN, "1dest").await?;
    service.wait_for_settlements().await;

    // Keep the second withdrawal pending
    let slow = WalletService::new(
        service.repository().clone(),
        test_config().with_settlement_delay(Duration::from_secs(60)),
    );
    slow.withdraw(eth.id, &owner, COIN, "0xdest").await?;

    // Another user's activity stays out of the numbers
    let stranger = common::owner();
    funded_wallet(&service, &stranger, Currency::Btc, 100 * COIN).await?;

    let stats = service.get_stats(owner.id).await?;
    assert_eq!(stats.total_transactions, 4);
    assert_eq!(stats.total_deposits, 7 * COIN);
    assert_eq!(stats.total_withdrawals, COIN);
    assert_eq!(stats.completed_count, 3);
    assert_eq!(stats.pending_count, 1);
    assert_eq!(stats.failed_count, 0);

    let btc_totals = &stats.by_currency[&Currency::Btc];
    assert_eq!(btc_totals.deposits, 2 * COIN);
    assert_eq!(btc_totals.withdrawals, COIN);
    assert_eq!(btc_totals.fees, COIN / 1000);

    let eth_totals = &stats.by_currency[&Currency::Eth];
    assert_eq!(eth_totals.deposits, 5 * COIN);
    assert_eq!(eth_totals.withdrawals, 0);

    slow.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_failed_withdrawals_are_counted() -> Result<()> {
    let (service, _temp) =
        test_service_with(Arc::new(RejectingChain), Arc::new(LogNotifier)).await?;
    let owner = owner();
    let wallet = funded_wallet(&service, &owner, Currency::Usdc, 3 * COIN).await?;

    service.withdraw(wallet.id, &owner, COIN, "0xdest").await?;
    service.wait_for_settlements().await;

    let stats = service.get_stats(owner.id).await?;
    assert_eq!(stats.failed_count, 1);
    assert_eq!(stats.completed_count, 1);
    assert_eq!(stats.total_withdrawals, 0);

    Ok(())
}

#[tokio::test]
async fn test_stats_for_unknown_user_are_empty() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let stats = service.get_stats(Uuid::new_v4()).await?;
    assert_eq!(stats.total_transactions, 0);
    assert!(stats.by_currency.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_user_transactions_are_most_recent_first() -> Result<()> {
    let config = test_config().with_settlement_delay(Duration::from_secs(60));
    let (service, _temp) = test_service_with_config(config).await?;
    let owner = owner();

    let btc = funded_wallet(&service, &owner, Currency::Btc, COIN).await?;
    let eth = funded_wallet(&service, &owner, Currency::Eth, COIN).await?;
    let withdrawal = service.withdraw(btc.id, &owner, COIN / 2, "1dest").await?;

    let transactions = service.list_user_transactions(owner.id).await?;
    assert_eq!(transactions.len(), 3);
    assert_eq!(transactions[0].id, withdrawal.transaction.id);
    assert_eq!(transactions[1].wallet_id, eth.id);
    assert_eq!(transactions[2].wallet_id, btc.id);
    assert_eq!(transactions[2].kind, TransactionType::Deposit);

    let btc_only = service.get_wallet_transactions(btc.id, owner.id).await?;
    assert_eq!(btc_only.len(), 2);
    assert_eq!(btc_only[0].status, TransactionStatus::Pending);

    service.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_verify_balances_detects_tampering() -> Result<()> {
    let (service, temp) = test_service().await?;
    let owner = owner();
    let wallet = funded_wallet(&service, &owner, Currency::Bnb, 4 * COIN).await?;
    funded_wallet(&service, &owner, Currency::Usdt, COIN).await?;
    service.withdraw(wallet.id, &owner, COIN, "0xdest").await?;
    service.wait_for_settlements().await;

    assert!(service.verify_balances(owner.id).await?.is_empty());

    // Write behind the service's back
    let db_path = temp.path().join("test.db");
    let pool = sqlx::SqlitePool::connect(&format!("sqlite:{}", db_path.display())).await?;
    sqlx::query("UPDATE wallets SET balance = balance + 1 WHERE id = ?")
        .bind(wallet.id.to_string())
        .execute(&pool)
        .await?;
    pool.close().await;

    let discrepancies = service.verify_balances(owner.id).await?;
    assert_eq!(discrepancies.len(), 1);
    let issue = &discrepancies[0];
    assert_eq!(issue.wallet_id, wallet.id);
    assert_eq!(issue.currency, Currency::Bnb);
    assert_eq!(issue.replayed, 4 * COIN - COIN - COIN / 1000);
    assert_eq!(issue.stored, issue.replayed + 1);

    Ok(())
}
