mod repository;

pub use repository::*;

/// SQL migration for wallets, ledger entries and the sequence counter
pub const MIGRATION_001_WALLETS: &str = include_str!("migrations/001_wallets.sql");

/// SQL migration for cards
pub const MIGRATION_002_CARDS: &str = include_str!("migrations/002_cards.sql");
