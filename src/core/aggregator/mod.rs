//! Aggregator façade
//!
//! The single entry point consumers use. Hides provider selection, failover,
//! and health feedback behind one uniform account/inbox contract.

mod aggregator;
mod events;

#[cfg(test)]
mod tests;

pub use aggregator::MailGateway;
pub use events::AccountEvent;
