use thiserror::Error;

use crate::domain::{
    CardTransitionError, Cents, ParseAmountError, SpendingError, StatusTransitionError, Units,
    UnsupportedCurrency,
};

/// Stable, outward-facing classification of every failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InsufficientBalance,
    InvalidLimit,
    InvalidStateTransition,
    ValidationFailed,
    SpendingLimitExceeded,
    StorageFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::InsufficientBalance => "insufficient_balance",
            ErrorKind::InvalidLimit => "invalid_limit",
            ErrorKind::InvalidStateTransition => "invalid_state_transition",
            ErrorKind::ValidationFailed => "validation_failed",
            ErrorKind::SpendingLimitExceeded => "spending_limit_exceeded",
            ErrorKind::StorageFailure => "storage_failure",
        }
    }

    /// Process exit status the CLI reports for this kind.
    pub fn exit_code(&self) -> u8 {
        match self {
            ErrorKind::ValidationFailed => 2,
            ErrorKind::NotFound => 3,
            ErrorKind::AlreadyExists => 4,
            ErrorKind::InsufficientBalance => 5,
            ErrorKind::InvalidLimit => 6,
            ErrorKind::InvalidStateTransition => 7,
            ErrorKind::SpendingLimitExceeded => 8,
            ErrorKind::StorageFailure => 10,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Card not found: {0}")]
    CardNotFound(String),

    #[error("Wallet for {0} already exists")]
    WalletAlreadyExists(String),

    #[error("Insufficient balance: balance {balance}, required {required}")]
    InsufficientBalance { balance: Units, required: Units },

    #[error("Invalid spending limit: {0}")]
    InvalidLimit(SpendingError),

    #[error("Spending limit exceeded: {0}")]
    SpendingLimitExceeded(SpendingError),

    #[error("Invalid card state transition: {0}")]
    CardTransition(#[from] CardTransitionError),

    #[error("Invalid transaction state transition: {0}")]
    TransactionTransition(#[from] StatusTransitionError),

    #[error("Wallet is inactive: {0}")]
    WalletInactive(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid spending limit value: {0}")]
    InvalidLimitValue(Cents),

    #[error(transparent)]
    UnsupportedCurrency(#[from] UnsupportedCurrency),

    #[error("Invalid amount: {0}")]
    ParseAmount(#[from] ParseAmountError),

    #[error("Invalid card type '{0}'. Valid types: virtual, physical")]
    InvalidCardType(String),

    #[error("Destination address must not be empty")]
    EmptyAddress,

    #[error("Could not generate a unique {what} after {attempts} attempts")]
    GenerationExhausted { what: &'static str, attempts: u32 },

    #[error("Database error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl AppError {
    /// The stable kind the boundary layer maps to its own status codes.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::WalletNotFound(_)
            | AppError::TransactionNotFound(_)
            | AppError::CardNotFound(_) => ErrorKind::NotFound,
            AppError::WalletAlreadyExists(_) => ErrorKind::AlreadyExists,
            AppError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            AppError::InvalidLimit(_) => ErrorKind::InvalidLimit,
            AppError::SpendingLimitExceeded(_) => ErrorKind::SpendingLimitExceeded,
            AppError::CardTransition(_)
            | AppError::TransactionTransition(_)
            | AppError::WalletInactive(_) => ErrorKind::InvalidStateTransition,
            AppError::InvalidAmount(_)
            | AppError::InvalidLimitValue(_)
            | AppError::UnsupportedCurrency(_)
            | AppError::ParseAmount(_)
            | AppError::InvalidCardType(_)
            | AppError::EmptyAddress => ErrorKind::ValidationFailed,
            AppError::GenerationExhausted { .. } | AppError::Storage(_) => {
                ErrorKind::StorageFailure
            }
        }
    }
}
