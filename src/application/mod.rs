// Application layer - use cases and orchestration.
// Services own every balance and status mutation; the CLI only calls them.

pub mod cards;
pub mod error;
pub mod service;
pub mod settlement;

pub use cards::CardService;
pub use error::*;
pub use service::{Receipt, WalletService};
pub use settlement::SettlementScheduler;
