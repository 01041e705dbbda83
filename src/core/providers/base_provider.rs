//! Adapter contract
//!
//! Every backing mailbox service implements [`MailProvider`]. Adapters are
//! stateless aside from transient auth tokens; all resilience (serialization,
//! spacing, backoff, health, failover) lives outside this trait.

use super::error::ProviderError;
use crate::core::types::{Account, Message};
use async_trait::async_trait;

/// Contract every provider adapter must satisfy
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Stable provider name, matching [`crate::core::types::ProviderId::as_str`]
    fn name(&self) -> &'static str;

    /// Create a fresh disposable account, optionally with a local-part prefix
    async fn create_account(&self, prefix: Option<&str>) -> Result<Account, ProviderError>;

    /// List the account's inbox, newest first
    async fn list_messages(&self, account: &Account) -> Result<Vec<Message>, ProviderError>;

    /// Fetch one message with its full body
    async fn read_message(&self, account: &Account, id: &str) -> Result<Message, ProviderError>;

    /// Delete a message. Best-effort: providers without delete support no-op.
    async fn delete_message(&self, _account: &Account, _id: &str) -> Result<(), ProviderError> {
        Ok(())
    }
}
