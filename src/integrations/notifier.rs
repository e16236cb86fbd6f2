use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::{CardType, Currency, TransactionType, Units, format_units};

/// An event the owner should hear about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Notification {
    Transaction {
        email: String,
        kind: TransactionType,
        amount: Units,
        currency: Currency,
    },
    CardIssued {
        email: String,
        card_type: CardType,
    },
}

impl Notification {
    pub fn email(&self) -> &str {
        match self {
            Notification::Transaction { email, .. } | Notification::CardIssued { email, .. } => {
                email
            }
        }
    }

    pub fn subject(&self) -> String {
        match self {
            Notification::Transaction {
                kind,
                amount,
                currency,
                ..
            } => format!("Transaction {}: {} {}", kind, format_units(*amount), currency),
            Notification::CardIssued { card_type, .. } => format!("New {} card issued", card_type),
        }
    }
}

/// Delivers notifications. Delivery is best effort; callers never wait on it.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<()>;
}

/// Writes notifications to the log instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: Notification) -> Result<()> {
        info!(to = notification.email(), subject = %notification.subject(), "notification sent");
        Ok(())
    }
}

/// Send a notification on a background task. Failures are logged and
/// never reach the caller.
pub fn dispatch_notification(notifier: &Arc<dyn Notifier>, notification: Notification) {
    let notifier = notifier.clone();
    tokio::spawn(async move {
        let to = notification.email().to_string();
        if let Err(err) = notifier.notify(notification).await {
            warn!(%to, error = %err, "failed to deliver notification");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_subject() {
        let notification = Notification::Transaction {
            email: "jane@example.com".into(),
            kind: TransactionType::Deposit,
            amount: 150_000_000,
            currency: Currency::Btc,
        };
        assert_eq!(notification.subject(), "Transaction deposit: 1.50000000 BTC");
        assert_eq!(notification.email(), "jane@example.com");
    }

    #[test]
    fn test_card_issued_subject() {
        let notification = Notification::CardIssued {
            email: "jane@example.com".into(),
            card_type: CardType::Virtual,
        };
        assert_eq!(notification.subject(), "New virtual card issued");
    }
}
