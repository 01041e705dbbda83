//! Account types
//!
//! An [`Account`] is the caller-visible result of a successful account
//! creation. The gateway holds no long-lived reference to it beyond the
//! "current account" slot used for cache and refresh decisions.

use super::provider::ProviderId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A disposable mailbox account on one specific provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Full logical address, e.g. `qx7f3a@somoj.com`
    pub address: String,
    /// Provider that owns this account; inbox reads are pinned here
    pub provider: ProviderId,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Expiry time; past this the account is regenerated on demand
    pub expires_at: DateTime<Utc>,
    /// Opaque provider-specific credential blob (tokens, session ids,
    /// passwords). Only the owning adapter interprets it.
    pub credentials: serde_json::Value,
}

impl Account {
    /// Whether the account is past its expiry time
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Local part of the address (before the `@`)
    pub fn local_part(&self) -> &str {
        self.address.split('@').next().unwrap_or(&self.address)
    }
}

/// One entry in the bounded, most-recent-first account history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountHistoryEntry {
    /// The account's address
    pub address: String,
    /// Owning provider
    pub provider: ProviderId,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Expiry time
    pub expires_at: DateTime<Utc>,
}

impl From<&Account> for AccountHistoryEntry {
    fn from(account: &Account) -> Self {
        Self {
            address: account.address.clone(),
            provider: account.provider,
            created_at: account.created_at,
            expires_at: account.expires_at,
        }
    }
}

/// Options for account creation
#[derive(Debug, Clone, Default)]
pub struct CreateAccountOptions {
    /// Preferred provider for the first attempt; failover may still move on
    pub provider: Option<ProviderId>,
    /// Desired local-part prefix; adapters append randomness as needed
    pub prefix: Option<String>,
    /// Account lifetime override
    pub ttl: Option<Duration>,
}
