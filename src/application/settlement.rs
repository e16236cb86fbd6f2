use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::domain::{Transaction, TransactionId, TransactionStatus};
use crate::integrations::{Blockchain, SettlementOutcome};
use crate::storage::Repository;

/// Drives pending withdrawals to a terminal state after the confirmation delay.
///
/// The pending row in storage is the durable marker; timers here are only
/// the in-process schedule and can always be rebuilt from storage.
pub struct SettlementScheduler {
    repo: Repository,
    chain: Arc<dyn Blockchain>,
    delay: Duration,
    tracker: TaskTracker,
    shutdown: CancellationToken,
    timers: Arc<DashMap<TransactionId, CancellationToken>>,
}

impl SettlementScheduler {
    pub fn new(repo: Repository, chain: Arc<dyn Blockchain>, delay: Duration) -> Self {
        Self {
            repo,
            chain,
            delay,
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
            timers: Arc::new(DashMap::new()),
        }
    }

    /// Schedule settlement of a pending withdrawal.
    /// Returns false if it already has a timer or shutdown has begun.
    pub fn schedule(&self, tx: &Transaction) -> bool {
        if self.shutdown.is_cancelled() {
            return false;
        }

        let token = self.shutdown.child_token();
        match self.timers.entry(tx.id) {
            Entry::Occupied(_) => return false,
            Entry::Vacant(slot) => {
                slot.insert(token.clone());
            }
        }

        let wait = remaining_delay(tx.created_at, self.delay, Utc::now());
        let repo = self.repo.clone();
        let chain = self.chain.clone();
        let timers = self.timers.clone();
        let tx = tx.clone();

        debug!(transaction_id = %tx.id, wait_ms = wait.as_millis() as u64, "settlement scheduled");

        self.tracker.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(transaction_id = %tx.id, "settlement cancelled");
                }
                _ = tokio::time::sleep(wait) => {
                    if let Err(err) = settle(&repo, chain.as_ref(), &tx).await {
                        warn!(transaction_id = %tx.id, error = %err, "settlement failed, left pending");
                    }
                }
            }
            timers.remove(&tx.id);
        });

        true
    }

    /// Cancel the timer of one transaction. Returns false if none was running.
    pub fn cancel(&self, id: TransactionId) -> bool {
        match self.timers.remove(&id) {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_scheduled(&self, id: TransactionId) -> bool {
        self.timers.contains_key(&id)
    }

    pub fn scheduled_count(&self) -> usize {
        self.timers.len()
    }

    /// Settle every overdue withdrawal in `pending` now, skipping any that
    /// still has a running timer. Returns how many reached a final status.
    pub async fn settle_due(&self, pending: &[Transaction]) -> usize {
        let now = Utc::now();
        let mut settled = 0;

        for tx in pending {
            if self.is_scheduled(tx.id) || !remaining_delay(tx.created_at, self.delay, now).is_zero()
            {
                continue;
            }
            match settle(&self.repo, self.chain.as_ref(), tx).await {
                Ok(true) => settled += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(transaction_id = %tx.id, error = %err, "settlement failed, left pending")
                }
            }
        }

        settled
    }

    /// Wait until every scheduled settlement has run or been cancelled.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Cancel every outstanding timer and wait for the tasks to exit.
    /// Cancelled withdrawals stay pending and resume on the next start.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}

/// Returns false if the withdrawal was no longer pending.
async fn settle(
    repo: &Repository,
    chain: &dyn Blockchain,
    tx: &Transaction,
) -> anyhow::Result<bool> {
    match chain.confirm_withdrawal(tx).await? {
        SettlementOutcome::Confirmed => {
            if repo.complete_transaction(tx.id).await? {
                info!(transaction_id = %tx.id, wallet_id = %tx.wallet_id, "withdrawal settled");
                return Ok(true);
            }
            debug!(transaction_id = %tx.id, "withdrawal no longer pending, nothing to settle");
        }
        SettlementOutcome::Rejected { reason } => {
            match repo
                .reverse_withdrawal(tx.id, TransactionStatus::Failed)
                .await?
            {
                Some(balance) => {
                    warn!(
                        transaction_id = %tx.id,
                        wallet_id = %tx.wallet_id,
                        %reason,
                        new_balance = balance,
                        "withdrawal rejected, amount and fee refunded"
                    );
                    return Ok(true);
                }
                None => {
                    debug!(transaction_id = %tx.id, "withdrawal no longer pending, nothing to refund")
                }
            }
        }
    }
    Ok(false)
}

/// Time left until a transaction created at `created_at` is due.
fn remaining_delay(created_at: DateTime<Utc>, delay: Duration, now: DateTime<Utc>) -> Duration {
    let elapsed = (now - created_at).to_std().unwrap_or(Duration::ZERO);
    delay.saturating_sub(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_delay_counts_down() {
        let now = Utc::now();
        let created = now - chrono::Duration::milliseconds(1000);
        assert_eq!(
            remaining_delay(created, Duration::from_millis(3000), now),
            Duration::from_millis(2000)
        );
    }

    #[test]
    fn test_remaining_delay_is_zero_when_overdue() {
        let now = Utc::now();
        let created = now - chrono::Duration::seconds(60);
        assert_eq!(
            remaining_delay(created, Duration::from_secs(3), now),
            Duration::ZERO
        );
    }

    #[test]
    fn test_remaining_delay_with_future_timestamp() {
        // Clock skew: a row stamped slightly ahead still waits the full delay
        let now = Utc::now();
        let created = now + chrono::Duration::seconds(1);
        assert_eq!(
            remaining_delay(created, Duration::from_secs(3), now),
            Duration::from_secs(3)
        );
    }
}
