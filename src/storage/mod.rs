//! Persistent state collaborator
//!
//! The gateway treats persistence as an external key/value store and imposes
//! no schema beyond the three persisted shapes: the current account, the
//! bounded account history, and the last inbox snapshot. The in-memory
//! implementation backs tests and the CLI; embedders supply their own.

use crate::utils::error::{GatewayError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Well-known storage keys
pub mod keys {
    /// The single "current account" slot
    pub const CURRENT_ACCOUNT: &str = "current_account";
    /// Bounded most-recent-first account history
    pub const ACCOUNT_HISTORY: &str = "account_history";
    /// Snapshot of the last successful inbox fetch
    pub const INBOX_CACHE: &str = "inbox_cache";
}

/// Key/value storage contract
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Fetch a value, `None` when the key is absent
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;

    /// Store a value under a key, overwriting any previous value
    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()>;

    /// Remove a key; absent keys are not an error
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local storage backend
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, serde_json::Value>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Typed read helper over the untyped store
pub async fn get_typed<T: serde::de::DeserializeOwned>(
    store: &dyn StorageBackend,
    key: &str,
) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| GatewayError::Storage(format!("corrupt value under '{}': {}", key, e))),
        None => Ok(None),
    }
}

/// Typed write helper over the untyped store
pub async fn set_typed<T: serde::Serialize>(
    store: &dyn StorageBackend,
    key: &str,
    value: &T,
) -> Result<()> {
    store.set(key, serde_json::to_value(value)?).await
}
