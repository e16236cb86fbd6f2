use chrono::{DateTime, Months, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, Owner, UserId};

pub type CardId = Uuid;

/// Issuer prefix every generated card number starts with.
pub const CARD_NUMBER_PREFIX: &str = "4532";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    Virtual,
    Physical,
}

impl CardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Virtual => "virtual",
            CardType::Physical => "physical",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "virtual" => Some(CardType::Virtual),
            "physical" => Some(CardType::Physical),
            _ => None,
        }
    }
}

impl std::fmt::Display for CardType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    Pending,
    Active,
    Blocked,
    Frozen,
    Cancelled,
    Expired,
}

impl CardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardStatus::Pending => "pending",
            CardStatus::Active => "active",
            CardStatus::Blocked => "blocked",
            CardStatus::Frozen => "frozen",
            CardStatus::Cancelled => "cancelled",
            CardStatus::Expired => "expired",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(CardStatus::Pending),
            "active" => Some(CardStatus::Active),
            "blocked" => Some(CardStatus::Blocked),
            "frozen" => Some(CardStatus::Frozen),
            "cancelled" => Some(CardStatus::Cancelled),
            "expired" => Some(CardStatus::Expired),
            _ => None,
        }
    }

    /// Status after activation. Blocked cards can never be reactivated.
    pub fn activate(self) -> Result<CardStatus, CardTransitionError> {
        match self {
            CardStatus::Active => Err(CardTransitionError::AlreadyActive),
            CardStatus::Blocked => Err(CardTransitionError::Blocked),
            _ => Ok(CardStatus::Active),
        }
    }

    /// Status after blocking. Any non-blocked card can be blocked.
    pub fn block(self) -> Result<CardStatus, CardTransitionError> {
        match self {
            CardStatus::Blocked => Err(CardTransitionError::AlreadyBlocked),
            _ => Ok(CardStatus::Blocked),
        }
    }
}

impl std::fmt::Display for CardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardTransitionError {
    AlreadyActive,
    Blocked,
    AlreadyBlocked,
    NotActive(CardStatus),
}

impl std::fmt::Display for CardTransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CardTransitionError::AlreadyActive => write!(f, "card is already active"),
            CardTransitionError::Blocked => write!(f, "blocked cards cannot be activated"),
            CardTransitionError::AlreadyBlocked => write!(f, "card is already blocked"),
            CardTransitionError::NotActive(status) => {
                write!(f, "card is {}, only active cards can spend", status)
            }
        }
    }
}

impl std::error::Error for CardTransitionError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpendingError {
    /// New limit would sit below what has already been spent
    LimitBelowSpending { limit: Cents, current_spending: Cents },
    /// Spend would push current spending past the limit
    LimitExceeded {
        limit: Cents,
        current_spending: Cents,
        requested: Cents,
    },
}

impl std::fmt::Display for SpendingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpendingError::LimitBelowSpending {
                limit,
                current_spending,
            } => write!(
                f,
                "spending limit {} cannot be lower than current spending {}",
                limit, current_spending
            ),
            SpendingError::LimitExceeded {
                limit,
                current_spending,
                requested,
            } => write!(
                f,
                "spending {} would exceed limit {} (already spent {})",
                requested, limit, current_spending
            ),
        }
    }
}

impl std::error::Error for SpendingError {}

/// A payment card tracking cumulative spend against a limit.
/// `current_spending <= spending_limit` always holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub user_id: UserId,
    pub card_number: String,
    pub card_holder_name: String,
    pub card_type: CardType,
    pub status: CardStatus,
    pub expiry_date: NaiveDate,
    pub spending_limit: Cents,
    pub current_spending: Cents,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Card {
    pub fn new(
        owner: &Owner,
        card_type: CardType,
        spending_limit: Cents,
        card_number: String,
        currency: impl Into<String>,
        validity_months: u32,
    ) -> Self {
        assert!(spending_limit > 0, "Spending limit must be positive");
        let now = Utc::now();
        let today = now.date_naive();
        Self {
            id: Uuid::new_v4(),
            user_id: owner.id,
            card_number,
            card_holder_name: owner.card_holder_name(),
            card_type,
            status: CardStatus::Pending,
            expiry_date: today
                .checked_add_months(Months::new(validity_months))
                .unwrap_or(NaiveDate::MAX),
            spending_limit,
            current_spending: 0,
            currency: currency.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn remaining(&self) -> Cents {
        self.spending_limit - self.current_spending
    }

    pub fn check_new_limit(&self, limit: Cents) -> Result<(), SpendingError> {
        if limit < self.current_spending {
            return Err(SpendingError::LimitBelowSpending {
                limit,
                current_spending: self.current_spending,
            });
        }
        Ok(())
    }

    pub fn check_spend(&self, amount: Cents) -> Result<(), SpendingError> {
        if amount > self.remaining() {
            return Err(SpendingError::LimitExceeded {
                limit: self.spending_limit,
                current_spending: self.current_spending,
                requested: amount,
            });
        }
        Ok(())
    }

    /// Card number with only the last four digits visible.
    pub fn masked_number(&self) -> String {
        let last_four = &self.card_number[self.card_number.len().saturating_sub(4)..];
        format!("{} **** **** {}", CARD_NUMBER_PREFIX, last_four)
    }
}

/// Generate a 16-digit card number: the issuer prefix plus 12 random digits.
pub fn generate_card_number() -> String {
    let mut rng = rand::thread_rng();
    let digits: String = (0..12)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect();
    format!("{}{}", CARD_NUMBER_PREFIX, digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_card(limit: Cents) -> Card {
        let owner = Owner::new(Uuid::new_v4(), "jane@example.com", "Jane", "Doe");
        Card::new(&owner, CardType::Virtual, limit, generate_card_number(), "USD", 36)
    }

    #[test]
    fn test_new_card_is_pending_and_unspent() {
        let card = sample_card(500_000);
        assert_eq!(card.status, CardStatus::Pending);
        assert_eq!(card.current_spending, 0);
        assert_eq!(card.card_holder_name, "JANE DOE");
        assert!(card.expiry_date > Utc::now().date_naive());
    }

    #[test]
    fn test_card_number_format() {
        let number = generate_card_number();
        assert_eq!(number.len(), 16);
        assert!(number.starts_with(CARD_NUMBER_PREFIX));
        assert!(number.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_masked_number_shows_last_four() {
        let mut card = sample_card(500_000);
        card.card_number = "4532000011112222".into();
        assert_eq!(card.masked_number(), "4532 **** **** 2222");
    }

    #[test]
    fn test_activate_transitions() {
        use CardStatus::*;

        for from in [Pending, Frozen, Cancelled, Expired] {
            assert_eq!(from.activate(), Ok(Active));
        }
        assert_eq!(Active.activate(), Err(CardTransitionError::AlreadyActive));
        assert_eq!(Blocked.activate(), Err(CardTransitionError::Blocked));
    }

    #[test]
    fn test_block_transitions() {
        use CardStatus::*;

        for from in [Pending, Active, Frozen, Cancelled, Expired] {
            assert_eq!(from.block(), Ok(Blocked));
        }
        assert_eq!(Blocked.block(), Err(CardTransitionError::AlreadyBlocked));
    }

    #[test]
    fn test_limit_cannot_drop_below_spending() {
        let mut card = sample_card(500_000);
        card.current_spending = 200_000;

        assert!(card.check_new_limit(199_999).is_err());
        assert!(card.check_new_limit(200_000).is_ok());
    }

    #[test]
    fn test_spend_within_remaining() {
        let mut card = sample_card(10_000);
        card.current_spending = 6_000;

        assert_eq!(card.remaining(), 4_000);
        assert!(card.check_spend(4_000).is_ok());
        assert!(matches!(
            card.check_spend(4_001),
            Err(SpendingError::LimitExceeded { .. })
        ));
    }
}
