//! Provider registry
//!
//! Fixed map from provider identity to its adapter and its dedicated request
//! queue. The set is built once at startup and never changes; there is no
//! dynamic registration at runtime.

use super::base_provider::MailProvider;
use super::dropmail::DropMailProvider;
use super::guerrilla::GuerrillaProvider;
use super::mail_tm::MailTmProvider;
use crate::config::GatewayConfig;
use crate::core::queue::RequestQueue;
use crate::core::types::ProviderId;
use crate::utils::error::{GatewayError, Result};
use crate::utils::jitter::JitterSource;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// One registered provider: its adapter behind its serialized queue
pub struct ProviderEntry {
    /// The wire adapter
    pub adapter: Arc<dyn MailProvider>,
    /// The provider's dedicated rate-limited queue; every adapter call goes
    /// through it
    pub queue: RequestQueue,
}

/// Registry of the process's fixed provider set
pub struct ProviderRegistry {
    entries: HashMap<ProviderId, ProviderEntry>,
}

impl ProviderRegistry {
    /// Create an empty registry (tests compose their own adapters)
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Build the registry with the real adapters for every configured provider
    pub fn with_defaults(
        config: &GatewayConfig,
        jitter: Arc<dyn JitterSource>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| GatewayError::Config(format!("http client: {}", e)))?;
        let ttl = chrono::Duration::minutes(config.aggregator.account_ttl_minutes);

        let mut registry = Self::new();
        for &provider in &config.providers {
            let adapter: Arc<dyn MailProvider> = match provider {
                ProviderId::MailTm => Arc::new(MailTmProvider::new(client.clone(), ttl)),
                ProviderId::GuerrillaMail => {
                    Arc::new(GuerrillaProvider::new(client.clone(), ttl))
                }
                ProviderId::DropMail => Arc::new(DropMailProvider::new(client.clone(), ttl)),
            };
            registry.register(provider, adapter, config, jitter.clone());
        }
        Ok(registry)
    }

    /// Register an adapter under its identity with a fresh queue
    pub fn register(
        &mut self,
        provider: ProviderId,
        adapter: Arc<dyn MailProvider>,
        config: &GatewayConfig,
        jitter: Arc<dyn JitterSource>,
    ) {
        info!(provider = %provider, "registered provider");
        self.entries.insert(
            provider,
            ProviderEntry {
                adapter,
                queue: RequestQueue::new(provider, config.queue.clone(), jitter),
            },
        );
    }

    /// Look up a provider's entry
    pub fn get(&self, provider: ProviderId) -> Result<&ProviderEntry> {
        self.entries
            .get(&provider)
            .ok_or_else(|| GatewayError::UnknownProvider(provider.as_str().to_string()))
    }

    /// All registered identities
    pub fn providers(&self) -> Vec<ProviderId> {
        self.entries.keys().copied().collect()
    }

    /// Number of registered providers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
