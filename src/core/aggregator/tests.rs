//! Gateway unit tests
//!
//! Scripted in-memory adapters stand in for the real providers; every test
//! runs under tokio's paused clock so queue spacing and retry delays cost
//! nothing.

use super::{AccountEvent, MailGateway};
use crate::config::GatewayConfig;
use crate::core::providers::{MailProvider, ProviderError, ProviderRegistry};
use crate::core::types::{Account, CreateAccountOptions, Message, ProviderId};
use crate::storage::{self, MemoryStore, keys};
use crate::utils::error::GatewayError;
use crate::utils::jitter::{JitterSource, NoJitter};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Adapter whose failures are scripted per call; successes are minted
/// deterministically.
struct ScriptedProvider {
    provider: ProviderId,
    create_errors: Mutex<VecDeque<ProviderError>>,
    list_errors: Mutex<VecDeque<ProviderError>>,
    inbox: Mutex<Vec<Message>>,
    created: AtomicU32,
}

impl ScriptedProvider {
    fn new(provider: ProviderId) -> Arc<Self> {
        Arc::new(Self {
            provider,
            create_errors: Mutex::new(VecDeque::new()),
            list_errors: Mutex::new(VecDeque::new()),
            inbox: Mutex::new(Vec::new()),
            created: AtomicU32::new(0),
        })
    }

    fn fail_next_create(&self, error: ProviderError) {
        self.create_errors.lock().push_back(error);
    }

    fn fail_next_list(&self, error: ProviderError) {
        self.list_errors.lock().push_back(error);
    }

    fn seed_message(&self, message: Message) {
        self.inbox.lock().push(message);
    }

    fn create_calls(&self) -> u32 {
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
            expires_at: now + ChronoDuration::minutes(60),
            credentials: serde_json::json!({ "token": "scripted" }),
        })
    }

    async fn list_messages(&self, _account: &Account) -> Result<Vec<Message>, ProviderError> {
        if let Some(error) = self.list_errors.lock().pop_front() {
            return Err(error);
        }
        Ok(self.inbox.lock().clone())
    }

    async fn read_message(&self, _account: &Account, id: &str) -> Result<Message, ProviderError> {
        self.inbox
            .lock()
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| ProviderError::MessageNotFound {
                provider: self.provider.as_str(),
                id: id.to_string(),
            })
    }
}

fn build(
    config: GatewayConfig,
    adapters: &[(ProviderId, Arc<ScriptedProvider>)],
) -> (MailGateway, Arc<MemoryStore>) {
    let jitter: Arc<dyn JitterSource> = Arc::new(NoJitter);
    let mut registry = ProviderRegistry::new();
    for (provider, adapter) in adapters {
        registry.register(*provider, adapter.clone(), &config, jitter.clone());
    }
    let store = Arc::new(MemoryStore::new());
    (
        MailGateway::new(config, registry, store.clone(), jitter),
        store,
    )
}

fn gateway_with(adapters: &[(ProviderId, Arc<ScriptedProvider>)]) -> (MailGateway, Arc<MemoryStore>) {
    let config = GatewayConfig {
        providers: adapters.iter().map(|(p, _)| *p).collect(),
        ..Default::default()
    };
    build(config, adapters)
}

fn message(id: &str) -> Message {
    Message {
        id: id.to_string(),
        from: "sender@corp.example".to_string(),
        subject: "verify".to_string(),
        received_at: Utc::now(),
        body: "code 123456".to_string(),
        html_body: None,
        read: false,
    }
}

#[tokio::test(start_paused = true)]
async fn test_create_prefers_highest_priority_provider() {
    let mail_tm = ScriptedProvider::new(ProviderId::MailTm);
    let guerrilla = ScriptedProvider::new(ProviderId::GuerrillaMail);
    let (gateway, _) = gateway_with(&[
        (ProviderId::MailTm, mail_tm.clone()),
        (ProviderId::GuerrillaMail, guerrilla.clone()),
    ]);

    let account = gateway
        .create_account(CreateAccountOptions::default())
        .await
        .unwrap();

    assert_eq!(account.provider, ProviderId::MailTm);
    assert_eq!(mail_tm.create_calls(), 1);
    assert_eq!(guerrilla.create_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_preferred_provider_steers_first_attempt_only() {
    let mail_tm = ScriptedProvider::new(ProviderId::MailTm);
    let dropmail = ScriptedProvider::new(ProviderId::DropMail);
    let (gateway, _) = gateway_with(&[
        (ProviderId::MailTm, mail_tm.clone()),
        (ProviderId::DropMail, dropmail.clone()),
    ]);

    // First call honors the caller's preference even though mail.tm outranks it
    let account = gateway
        .create_account(CreateAccountOptions {
            provider: Some(ProviderId::DropMail),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(account.provider, ProviderId::DropMail);
    assert_eq!(mail_tm.create_calls(), 0);

    // When the preferred provider fails, failover moves to the best scorer
    dropmail.fail_next_create(ProviderError::api("dropmail", 500, "boom"));
    let account = gateway
        .create_account(CreateAccountOptions {
            provider: Some(ProviderId::DropMail),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(account.provider, ProviderId::MailTm);
}

#[tokio::test(start_paused = true)]
async fn test_failover_records_the_failure() {
    let mail_tm = ScriptedProvider::new(ProviderId::MailTm);
    let guerrilla = ScriptedProvider::new(ProviderId::GuerrillaMail);
    let (gateway, _) = gateway_with(&[
        (ProviderId::MailTm, mail_tm.clone()),
        (ProviderId::GuerrillaMail, guerrilla.clone()),
    ]);

    mail_tm.fail_next_create(ProviderError::network("mail_tm", "connection reset"));
    let account = gateway
        .create_account(CreateAccountOptions::default())
        .await
        .unwrap();

    assert_eq!(account.provider, ProviderId::GuerrillaMail);
    let record = gateway.health().record(ProviderId::MailTm);
    assert_eq!(record.consecutive_failures, 1);
    assert!(record.last_error.is_some());
    assert_eq!(gateway.health().record(ProviderId::GuerrillaMail).consecutive_failures, 0);
}

#[tokio::test(start_paused = true)]
async fn test_exhausting_every_provider_is_terminal() {
    let mail_tm = ScriptedProvider::new(ProviderId::MailTm);
    let guerrilla = ScriptedProvider::new(ProviderId::GuerrillaMail);
    let dropmail = ScriptedProvider::new(ProviderId::DropMail);
    for adapter in [&mail_tm, &guerrilla, &dropmail] {
        adapter.fail_next_create(ProviderError::api(adapter.name(), 503, "down"));
    }
    let (gateway, _) = gateway_with(&[
        (ProviderId::MailTm, mail_tm),
        (ProviderId::GuerrillaMail, guerrilla),
        (ProviderId::DropMail, dropmail),
    ]);

    let error = gateway
        .create_account(CreateAccountOptions::default())
        .await
        .unwrap_err();

    assert!(error.is_exhausted());
    match error {
        GatewayError::AllProvidersUnavailable { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("unexpected error: {other}"),
    }
    for provider in ProviderId::ALL {
        assert!(gateway.health().record(provider).consecutive_failures >= 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_ttl_override_sets_expiry() {
    let mail_tm = ScriptedProvider::new(ProviderId::MailTm);
    let (gateway, _) = gateway_with(&[(ProviderId::MailTm, mail_tm)]);

    let account = gateway
        .create_account(CreateAccountOptions {
            ttl: Some(ChronoDuration::minutes(5)),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(account.expires_at, account.created_at + ChronoDuration::minutes(5));
}

#[tokio::test(start_paused = true)]
async fn test_history_is_bounded_and_most_recent_first() {
    let mail_tm = ScriptedProvider::new(ProviderId::MailTm);
    let mut config = GatewayConfig {
        providers: vec![ProviderId::MailTm],
        ..Default::default()
    };
    config.aggregator.history_cap = 3;
    let (gateway, _) = build(config, &[(ProviderId::MailTm, mail_tm)]);

    let mut last_address = String::new();
    for _ in 0..5 {
        let account = gateway
            .create_account(CreateAccountOptions::default())
            .await
            .unwrap();
        last_address = account.address;
    }

    let history = gateway.get_history().await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].address, last_address);
}

#[tokio::test(start_paused = true)]
async fn test_current_account_is_none_before_first_create() {
    let mail_tm = ScriptedProvider::new(ProviderId::MailTm);
    let (gateway, _) = gateway_with(&[(ProviderId::MailTm, mail_tm)]);

    assert!(gateway.get_current_account().await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_expired_current_account_is_regenerated() {
    let mail_tm = ScriptedProvider::new(ProviderId::MailTm);
    let (gateway, store) = gateway_with(&[(ProviderId::MailTm, mail_tm)]);

    let now = Utc::now();
    let expired = Account {
        address: "stale@mail_tm.test".to_string(),
        provider: ProviderId::MailTm,
        created_at: now - ChronoDuration::hours(2),
        expires_at: now - ChronoDuration::hours(1),
        credentials: serde_json::json!({}),
    };
    storage::set_typed(store.as_ref(), keys::CURRENT_ACCOUNT, &expired)
        .await
        .unwrap();

    let current = gateway.get_current_account().await.unwrap().unwrap();
    assert_ne!(current.address, expired.address);
    assert!(!current.is_expired());

    // The replacement is persisted as the new current account
    let persisted: Account = storage::get_typed(store.as_ref(), keys::CURRENT_ACCOUNT)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(persisted.address, current.address);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_inbox_rotates_to_another_provider() {
    let mail_tm = ScriptedProvider::new(ProviderId::MailTm);
    let guerrilla = ScriptedProvider::new(ProviderId::GuerrillaMail);
    let (gateway, store) = gateway_with(&[
        (ProviderId::MailTm, mail_tm.clone()),
        (ProviderId::GuerrillaMail, guerrilla.clone()),
    ]);

    let account = gateway
        .create_account(CreateAccountOptions::default())
        .await
        .unwrap();
    assert_eq!(account.provider, ProviderId::MailTm);

    let mut events = gateway.subscribe();
    mail_tm.fail_next_list(ProviderError::rate_limited("mail_tm", Some(30)));

    // The rate limit never surfaces: the caller sees an empty inbox and the
    // account quietly moves to a different provider.
    let messages = gateway.check_inbox(&account).await.unwrap();
    assert!(messages.is_empty());

    match events.try_recv().unwrap() {
        AccountEvent::Rotated { from, account: replacement } => {
            assert_eq!(from, ProviderId::MailTm);
            assert_eq!(replacement.provider, ProviderId::GuerrillaMail);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    let current: Account = storage::get_typed(store.as_ref(), keys::CURRENT_ACCOUNT)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.provider, ProviderId::GuerrillaMail);
    assert_eq!(gateway.health().record(ProviderId::MailTm).consecutive_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_non_rate_limit_inbox_errors_propagate() {
    let mail_tm = ScriptedProvider::new(ProviderId::MailTm);
    let (gateway, _) = gateway_with(&[(ProviderId::MailTm, mail_tm.clone())]);

    let account = gateway
        .create_account(CreateAccountOptions::default())
        .await
        .unwrap();

    mail_tm.fail_next_list(ProviderError::api("mail_tm", 500, "boom"));
    let error = gateway.check_inbox(&account).await.unwrap_err();
    assert!(matches!(error, GatewayError::Provider(_)));
    assert_eq!(gateway.health().record(ProviderId::MailTm).consecutive_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_created_event_is_emitted() {
    let mail_tm = ScriptedProvider::new(ProviderId::MailTm);
    let (gateway, _) = gateway_with(&[(ProviderId::MailTm, mail_tm)]);

    let mut events = gateway.subscribe();
    let account = gateway
        .create_account(CreateAccountOptions::default())
        .await
        .unwrap();

    match events.try_recv().unwrap() {
        AccountEvent::Created { account: created } => assert_eq!(created.address, account.address),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_delete_message_is_best_effort() {
    let mail_tm = ScriptedProvider::new(ProviderId::MailTm);
    let (gateway, _) = gateway_with(&[(ProviderId::MailTm, mail_tm.clone())]);

    let account = gateway
        .create_account(CreateAccountOptions::default())
        .await
        .unwrap();
    let before = gateway.health().record(ProviderId::MailTm).total_requests;

    // The scripted adapter does not override delete, so the contract's
    // default no-op applies and still counts as a recorded success.
    gateway.delete_message(&account, "m-1").await.unwrap();

    let record = gateway.health().record(ProviderId::MailTm);
    assert_eq!(record.total_requests, before + 1);
    assert_eq!(record.consecutive_failures, 0);
}

#[tokio::test(start_paused = true)]
async fn test_read_message_is_pinned_to_the_owning_provider() {
    let mail_tm = ScriptedProvider::new(ProviderId::MailTm);
    let (gateway, _) = gateway_with(&[(ProviderId::MailTm, mail_tm.clone())]);

    let account = gateway
        .create_account(CreateAccountOptions::default())
        .await
        .unwrap();
    mail_tm.seed_message(message("m-1"));

    let fetched = gateway.read_message(&account, "m-1").await.unwrap();
    assert_eq!(fetched.id, "m-1");

    let error = gateway.read_message(&account, "missing").await.unwrap_err();
    assert!(matches!(
        error,
        GatewayError::Provider(ProviderError::MessageNotFound { .. })
    ));
}
