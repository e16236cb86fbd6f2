mod card;
mod currency;
mod ledger;
mod money;
mod owner;
mod transaction;
mod wallet;

pub use card::*;
pub use currency::*;
pub use ledger::*;
pub use money::*;
pub use owner::*;
pub use transaction::*;
pub use wallet::*;
