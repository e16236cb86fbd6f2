use std::sync::Arc;

use tracing::{info, warn};

use crate::config::LedgerConfig;
use crate::domain::{
    Card, CardId, CardStatus, CardTransitionError, CardType, Cents, Owner, UserId,
    generate_card_number,
};
use crate::integrations::{LogNotifier, Notification, Notifier, dispatch_notification};
use crate::storage::{CardInsert, Repository};

use super::AppError;

/// Card spending tracker: issues cards, moves them through their lifecycle
/// and keeps cumulative spend within the limit.
pub struct CardService {
    repo: Repository,
    notifier: Arc<dyn Notifier>,
    card_numbers: fn() -> String,
    config: LedgerConfig,
}

impl CardService {
    pub fn new(repo: Repository, config: LedgerConfig) -> Self {
        Self::with_notifier(repo, config, Arc::new(LogNotifier))
    }

    pub fn with_notifier(
        repo: Repository,
        config: LedgerConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            repo,
            notifier,
            card_numbers: generate_card_number,
            config,
        }
    }

    /// Replace the card number source.
    pub fn with_card_number_generator(mut self, generator: fn() -> String) -> Self {
        self.card_numbers = generator;
        self
    }

    /// Issue a new card in `pending` status for the owner.
    pub async fn issue_card(
        &self,
        owner: &Owner,
        card_type: CardType,
        spending_limit: Cents,
    ) -> Result<Card, AppError> {
        validate_limit(spending_limit)?;

        let attempts = self.config.max_generation_attempts;
        for attempt in 1..=attempts {
            let card = Card::new(
                owner,
                card_type,
                spending_limit,
                (self.card_numbers)(),
                self.config.card_currency.clone(),
                self.config.card_validity_months,
            );

            match self.repo.save_card(&card).await? {
                CardInsert::Inserted => {
                    info!(card_id = %card.id, user_id = %owner.id, %card_type, "card issued");
                    dispatch_notification(
                        &self.notifier,
                        Notification::CardIssued {
                            email: owner.email.clone(),
                            card_type,
                        },
                    );
                    return Ok(card);
                }
                CardInsert::NumberTaken => {
                    warn!(attempt, "card number collision, regenerating");
                }
            }
        }

        Err(AppError::GenerationExhausted {
            what: "card number",
            attempts,
        })
    }

    pub async fn list_cards(&self, user_id: UserId) -> Result<Vec<Card>, AppError> {
        Ok(self.repo.list_user_cards(user_id).await?)
    }

    pub async fn get_card(&self, card_id: CardId, owner_id: UserId) -> Result<Card, AppError> {
        self.repo
            .get_owned_card(card_id, owner_id)
            .await?
            .ok_or_else(|| AppError::CardNotFound(card_id.to_string()))
    }

    /// Change the spending limit. It may never drop below current spending.
    pub async fn update_spending_limit(
        &self,
        card_id: CardId,
        owner_id: UserId,
        spending_limit: Cents,
    ) -> Result<Card, AppError> {
        validate_limit(spending_limit)?;

        loop {
            let card = self.get_card(card_id, owner_id).await?;
            card.check_new_limit(spending_limit)
                .map_err(AppError::InvalidLimit)?;

            if self
                .repo
                .update_spending_limit(card.id, owner_id, spending_limit)
                .await?
            {
                info!(card_id = %card.id, spending_limit, "spending limit updated");
                return self.get_card(card_id, owner_id).await;
            }
            // Spending moved underneath us; re-check against fresh state
        }
    }

    /// Activate a card. Blocked cards stay blocked.
    pub async fn activate(&self, card_id: CardId, owner_id: UserId) -> Result<Card, AppError> {
        self.transition(card_id, owner_id, CardStatus::activate).await
    }

    /// Block a card. There is no way back from blocked.
    pub async fn block(&self, card_id: CardId, owner_id: UserId) -> Result<Card, AppError> {
        self.transition(card_id, owner_id, CardStatus::block).await
    }

    /// Add `amount` to the card's running spend.
    pub async fn record_spending(
        &self,
        card_id: CardId,
        owner_id: UserId,
        amount: Cents,
    ) -> Result<Card, AppError> {
        if amount <= 0 {
            return Err(AppError::InvalidAmount(
                "Spending amount must be positive".to_string(),
            ));
        }

        loop {
            let card = self.get_card(card_id, owner_id).await?;
            if card.status != CardStatus::Active {
                return Err(CardTransitionError::NotActive(card.status).into());
            }
            card.check_spend(amount)
                .map_err(AppError::SpendingLimitExceeded)?;

            if let Some(current_spending) = self
                .repo
                .add_card_spending(card.id, owner_id, amount)
                .await?
            {
                info!(card_id = %card.id, amount, current_spending, "card spending recorded");
                return self.get_card(card_id, owner_id).await;
            }
        }
    }

    /// Permanently delete a card.
    pub async fn remove(&self, card_id: CardId, owner_id: UserId) -> Result<Card, AppError> {
        let card = self.get_card(card_id, owner_id).await?;
        if !self.repo.delete_card(card.id, owner_id).await? {
            return Err(AppError::CardNotFound(card_id.to_string()));
        }

        info!(card_id = %card.id, "card removed");
        Ok(card)
    }

    async fn transition(
        &self,
        card_id: CardId,
        owner_id: UserId,
        next: fn(CardStatus) -> Result<CardStatus, CardTransitionError>,
    ) -> Result<Card, AppError> {
        loop {
            let card = self.get_card(card_id, owner_id).await?;
            let to = next(card.status)?;

            if self.repo.set_card_status(card.id, card.status, to).await? {
                info!(card_id = %card.id, from = %card.status, %to, "card status changed");
                return self.get_card(card_id, owner_id).await;
            }
        }
    }
}

fn validate_limit(spending_limit: Cents) -> Result<(), AppError> {
    if spending_limit <= 0 {
        return Err(AppError::InvalidLimitValue(spending_limit));
    }
    Ok(())
}
