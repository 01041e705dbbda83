//! # tempmail-gateway
//!
//! A resilient gateway over free disposable-email providers. One uniform
//! account/inbox contract hides a fleet of unreliable upstreams behind
//! health tracking, circuit breaking, per-provider rate-limited queues, and
//! cross-provider failover.
//!
//! ## Features
//!
//! - **Multi-Provider**: mail.tm, Guerrilla Mail, and DropMail behind one API
//! - **Health Tracking**: rolling success rate, response time, and a
//!   composite score per provider
//! - **Circuit Breaking**: failing providers are benched with exponentially
//!   growing cooldowns and probed on re-entry
//! - **Rate-Limit Discipline**: per-provider serialized queues with minimum
//!   spacing and escalating backoff on 429s
//! - **Failover**: account creation cascades across providers; a rate-limited
//!   inbox rotates to a fresh account on a different provider
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tempmail_gateway::{CreateAccountOptions, GatewayConfig, MailGateway, MemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GatewayConfig::load(None)?;
//!     let gateway = MailGateway::with_defaults(config, Arc::new(MemoryStore::new()))?;
//!
//!     let account = gateway.create_account(CreateAccountOptions::default()).await?;
//!     println!("disposable address: {}", account.address);
//!
//!     let messages = gateway.check_inbox(&account).await?;
//!     for message in messages {
//!         println!("{}: {}", message.from, message.subject);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod core;
pub mod storage;
pub mod utils;

// Re-export the façade and its contract types
pub use crate::config::{AggregatorConfig, GatewayConfig, HealthConfig, QueueConfig};
pub use crate::core::aggregator::{AccountEvent, MailGateway};
pub use crate::core::health::{CircuitState, HealthTracker, ProviderHealthSnapshot};
pub use crate::core::providers::{MailProvider, ProviderError, ProviderRegistry};
pub use crate::core::types::{
    Account, AccountHistoryEntry, CreateAccountOptions, Message, ProviderId,
};
pub use crate::storage::{MemoryStore, StorageBackend};
pub use crate::utils::error::{GatewayError, Result};
