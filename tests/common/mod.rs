//! Shared harness for integration tests: a scriptable in-memory adapter and
//! a gateway builder wiring it up with deterministic jitter.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tempmail_gateway::core::providers::ProviderRegistry;
use tempmail_gateway::storage::MemoryStore;
use tempmail_gateway::utils::jitter::{JitterSource, NoJitter};
use tempmail_gateway::{
    Account, GatewayConfig, MailGateway, MailProvider, Message, ProviderError, ProviderId,
};

/// Adapter whose failures are scripted per call.
pub struct ScriptedProvider {
    provider: ProviderId,
    create_errors: Mutex<VecDeque<ProviderError>>,
    list_errors: Mutex<VecDeque<ProviderError>>,
    created: AtomicU32,
}

impl ScriptedProvider {
    pub fn new(provider: ProviderId) -> Arc<Self> {
        Arc::new(Self {
            provider,
            create_errors: Mutex::new(VecDeque::new()),
            list_errors: Mutex::new(VecDeque::new()),
            created: AtomicU32::new(0),
        })
    }

    pub fn fail_next_create(&self, error: ProviderError) {
        self.create_errors.lock().push_back(error);
    }

    pub fn fail_next_list(&self, error: ProviderError) {
        self.list_errors.lock().push_back(error);
    }

    pub fn create_calls(&self) -> u32 {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        self.provider.as_str()
    }

    async fn create_account(&self, prefix: Option<&str>) -> Result<Account, ProviderError> {
        if let Some(error) = self.create_errors.lock().pop_front() {
            return Err(error);
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        let local = match prefix {
            Some(prefix) => format!("{}{}", prefix, n),
            None => format!("acct{}", n),
        };
        let now = Utc::now();
        Ok(Account {
            address: format!("{}@{}.test", local, self.provider.as_str()),
            provider: self.provider,
            created_at: now,
            expires_at: now + Duration::minutes(60),
            credentials: serde_json::json!({}),
        })
    }

    async fn list_messages(&self, _account: &Account) -> Result<Vec<Message>, ProviderError> {
        if let Some(error) = self.list_errors.lock().pop_front() {
            return Err(error);
        }
        Ok(Vec::new())
    }

    async fn read_message(&self, _account: &Account, id: &str) -> Result<Message, ProviderError> {
        Err(ProviderError::MessageNotFound {
            provider: self.provider.as_str(),
            id: id.to_string(),
        })
    }
}

/// Gateway over the given scripted adapters, memory storage, zero jitter.
pub fn gateway(adapters: &[(ProviderId, Arc<ScriptedProvider>)]) -> MailGateway {
    let config = GatewayConfig {
        providers: adapters.iter().map(|(p, _)| *p).collect(),
        ..Default::default()
    };
    let jitter: Arc<dyn JitterSource> = Arc::new(NoJitter);
    let mut registry = ProviderRegistry::new();
    for (provider, adapter) in adapters {
        registry.register(*provider, adapter.clone(), &config, jitter.clone());
    }
    MailGateway::new(config, registry, Arc::new(MemoryStore::new()), jitter)
}
