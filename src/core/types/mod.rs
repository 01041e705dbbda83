//! Shared domain types
//!
//! Provider identities, accounts, and normalized inbox messages. These types
//! cross every component boundary and are immutable once constructed — the
//! health tracker and aggregator keep their own mutable state separately.

pub mod account;
pub mod message;
pub mod provider;

pub use account::{Account, AccountHistoryEntry, CreateAccountOptions};
pub use message::Message;
pub use provider::ProviderId;
