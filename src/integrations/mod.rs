//! Capabilities the core calls through instead of talking to the outside
//! world directly: chain access and user notifications.

mod chain;
mod notifier;

pub use chain::*;
pub use notifier::*;
