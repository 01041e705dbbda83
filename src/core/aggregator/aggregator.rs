//! Gateway orchestrator

use super::events::AccountEvent;
use crate::config::GatewayConfig;
use crate::core::health::HealthTracker;
use crate::core::providers::{ProviderError, ProviderRegistry};
use crate::core::types::{
    Account, AccountHistoryEntry, CreateAccountOptions, Message, ProviderId,
};
use crate::storage::{self, StorageBackend, keys};
use crate::utils::error::{GatewayError, Result};
use crate::utils::jitter::{JitterSource, ThreadRngJitter};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// The aggregator: one façade over the whole provider fleet.
///
/// Account creation fails over across providers; inbox reads are pinned to
/// the account's owning provider. Every adapter outcome feeds the health
/// tracker, closing the select → execute → record loop.
pub struct MailGateway {
    config: GatewayConfig,
    registry: ProviderRegistry,
    health: Arc<HealthTracker>,
    storage: Arc<dyn StorageBackend>,
    events: broadcast::Sender<AccountEvent>,
}

impl MailGateway {
    /// Assemble a gateway from explicit parts (tests inject scripted
    /// adapters and deterministic jitter here)
    pub fn new(
        config: GatewayConfig,
        registry: ProviderRegistry,
        storage: Arc<dyn StorageBackend>,
        jitter: Arc<dyn JitterSource>,
    ) -> Self {
        let health = Arc::new(HealthTracker::new(
            config.health.clone(),
            config.providers.clone(),
            jitter,
        ));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            registry,
            health,
            storage,
            events,
        }
    }

    /// Assemble a gateway with the real adapters and the given storage
    pub fn with_defaults(config: GatewayConfig, storage: Arc<dyn StorageBackend>) -> Result<Self> {
        config.validate()?;
        let jitter: Arc<dyn JitterSource> = Arc::new(ThreadRngJitter);
        let registry = ProviderRegistry::with_defaults(&config, jitter.clone())?;
        Ok(Self::new(config, registry, storage, jitter))
    }

    /// The health tracker (snapshots and operator resets)
    pub fn health(&self) -> &HealthTracker {
        &self.health
    }

    /// Subscribe to account lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<AccountEvent> {
        self.events.subscribe()
    }

    /// Create a disposable account, failing over across providers.
    ///
    /// The preferred provider (when given) is used for the first attempt
    /// only; afterwards each retry picks the best-scoring provider that has
    /// not been tried in this cascade, sleeping a jittered exponential delay
    /// between attempts. The only terminal failure is
    /// [`GatewayError::AllProvidersUnavailable`].
    pub async fn create_account(&self, options: CreateAccountOptions) -> Result<Account> {
        let mut tried = Vec::new();
        let account = self.create_with_failover(&options, &mut tried).await?;
        self.store_account(&account).await?;
        let _ = self.events.send(AccountEvent::Created {
            account: account.clone(),
        });
        Ok(account)
    }

    /// The persisted current account. An expired account is transparently
    /// replaced through the normal creation cascade; `None` means no account
    /// has ever been created.
    pub async fn get_current_account(&self) -> Result<Option<Account>> {
        match storage::get_typed::<Account>(self.storage.as_ref(), keys::CURRENT_ACCOUNT).await? {
            Some(account) if !account.is_expired() => Ok(Some(account)),
            Some(expired) => {
                info!(
                    address = %expired.address,
                    provider = %expired.provider,
                    "current account expired, regenerating"
                );
                self.create_account(CreateAccountOptions::default())
                    .await
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    /// Fetch the account's inbox, pinned to its owning provider.
    ///
    /// A rate-limited provider makes the account itself unusable, so instead
    /// of surfacing the error this rotates to a replacement account on the
    /// next-best different provider, emits [`AccountEvent::Rotated`], and
    /// returns an empty list; the caller's next poll sees the new address.
    /// Every other failure is recorded and re-thrown.
    pub async fn check_inbox(&self, account: &Account) -> Result<Vec<Message>> {
        let entry = self.registry.get(account.provider)?;
        let started = Instant::now();
        let result = entry
            .queue
            .run(|| entry.adapter.list_messages(account))
            .await;

        match result {
            Ok(messages) => {
                self.health
                    .record_success(account.provider, started.elapsed().as_millis() as u64);
                storage::set_typed(self.storage.as_ref(), keys::INBOX_CACHE, &messages).await?;
                Ok(messages)
            }
            Err(error) if error.is_rate_limited() => {
                self.health
                    .record_failure(account.provider, &error.to_string());
                warn!(
                    provider = %account.provider,
                    address = %account.address,
                    "inbox check rate limited, rotating account"
                );
                let replacement = self
                    .create_with_failover(
                        &CreateAccountOptions::default(),
                        &mut vec![account.provider],
                    )
                    .await?;
                self.store_account(&replacement).await?;
                let _ = self.events.send(AccountEvent::Rotated {
                    from: account.provider,
                    account: replacement,
                });
                Ok(Vec::new())
            }
            Err(error) => {
                self.health
                    .record_failure(account.provider, &error.to_string());
                Err(error.into())
            }
        }
    }

    /// Fetch one message from the account's owning provider. A specific
    /// message only exists where it was received, so there is no
    /// cross-provider retry; failures propagate directly.
    pub async fn read_message(&self, account: &Account, id: &str) -> Result<Message> {
        let entry = self.registry.get(account.provider)?;
        let started = Instant::now();
        let result = entry
            .queue
            .run(|| entry.adapter.read_message(account, id))
            .await;
        self.record_outcome(account.provider, started, &result);
        Ok(result?)
    }

    /// Delete one message on the account's owning provider, best-effort
    pub async fn delete_message(&self, account: &Account, id: &str) -> Result<()> {
        let entry = self.registry.get(account.provider)?;
        let started = Instant::now();
        let result = entry
            .queue
            .run(|| entry.adapter.delete_message(account, id))
            .await;
        self.record_outcome(account.provider, started, &result);
        Ok(result?)
    }

    /// Bounded account history, most recent first
    pub async fn get_history(&self) -> Result<Vec<AccountHistoryEntry>> {
        Ok(storage::get_typed(self.storage.as_ref(), keys::ACCOUNT_HISTORY)
            .await?
            .unwrap_or_default())
    }

    /// Run the bounded cross-provider cascade, recording every outcome.
    async fn create_with_failover(
        &self,
        options: &CreateAccountOptions,
        tried: &mut Vec<ProviderId>,
    ) -> Result<Account> {
        let max_attempts = self.config.aggregator.max_attempts;
        let mut last_error: Option<String> = None;
        let mut attempts = 0;

        for attempt in 0..max_attempts {
            // The caller's preference only steers the very first attempt;
            // failover always consults the tracker.
            let preferred = if attempt == 0 && tried.is_empty() {
                options.provider.filter(|p| !tried.contains(p))
            } else {
                None
            };
            let Some(provider) = preferred.or_else(|| self.health.best_provider(tried)) else {
                break;
            };

            if attempt > 0 {
                let delay = self.health.retry_delay(attempt - 1);
                debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    next = %provider,
                    "retrying account creation"
                );
                tokio::time::sleep(delay).await;
            }

            attempts += 1;
            tried.push(provider);

            match self.try_create(provider, options).await {
                Ok(account) => {
                    info!(
                        provider = %provider,
                        address = %account.address,
                        attempts,
                        "account created"
                    );
                    return Ok(account);
                }
                Err(error) => {
                    warn!(provider = %provider, %error, "account creation failed");
                    last_error = Some(error.to_string());
                }
            }
        }

        Err(GatewayError::AllProvidersUnavailable {
            attempts,
            last_error: last_error.unwrap_or_else(|| "no provider available".to_string()),
        })
    }

    /// One timed creation attempt against one provider, through its queue.
    async fn try_create(
        &self,
        provider: ProviderId,
        options: &CreateAccountOptions,
    ) -> Result<Account> {
        let entry = self.registry.get(provider)?;

        let started = Instant::now();
        let result = entry
            .queue
            .run(|| entry.adapter.create_account(options.prefix.as_deref()))
            .await;

        match result {
            Ok(mut account) => {
                if let Some(ttl) = options.ttl {
                    account.expires_at = account.created_at + ttl;
                }
                self.health
                    .record_success(provider, started.elapsed().as_millis() as u64);
                Ok(account)
            }
            Err(error) => {
                self.health.record_failure(provider, &error.to_string());
                Err(error.into())
            }
        }
    }

    /// Persist an account as current and prepend it to the bounded history.
    ///
    /// Creations that race are last-write-wins on the current slot, and the
    /// history read-modify-write below spans awaits, so a concurrent creation
    /// can drop the other's history entry. History is advisory; neither slot
    /// carries a stronger guarantee.
    async fn store_account(&self, account: &Account) -> Result<()> {
        storage::set_typed(self.storage.as_ref(), keys::CURRENT_ACCOUNT, account).await?;

        let mut history: Vec<AccountHistoryEntry> =
            storage::get_typed(self.storage.as_ref(), keys::ACCOUNT_HISTORY)
                .await?
                .unwrap_or_default();
        history.insert(0, AccountHistoryEntry::from(account));
        history.truncate(self.config.aggregator.history_cap);
        storage::set_typed(self.storage.as_ref(), keys::ACCOUNT_HISTORY, &history).await
    }

    fn record_outcome<T>(
        &self,
        provider: ProviderId,
        started: Instant,
        result: &std::result::Result<T, ProviderError>,
    ) {
        match result {
            Ok(_) => self
                .health
                .record_success(provider, started.elapsed().as_millis() as u64),
            Err(error) => self.health.record_failure(provider, &error.to_string()),
        }
    }
}
