//! Per-provider request serialization and backpressure absorption

use crate::config::QueueConfig;
use crate::core::providers::ProviderError;
use crate::core::types::ProviderId;
use crate::utils::jitter::JitterSource;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until, timeout};
use tracing::{debug, warn};

/// Mutable queue state, guarded by the serialization mutex
struct QueueState {
    /// Start time of the most recent request; spacing is measured from here
    last_started: Option<Instant>,
    /// Active cooldown window; requests suspend until it elapses
    cooldown_until: Option<Instant>,
    /// Current backoff duration, doubled on each rate-limit signal
    backoff: Duration,
}

/// Serialized, rate-limited gate in front of one provider's adapter.
///
/// The mutex is tokio's fair mutex, so waiters run in strict submission
/// order and the lock is held across the wrapped call itself — two requests
/// to the same provider can never overlap.
pub struct RequestQueue {
    provider: ProviderId,
    config: QueueConfig,
    jitter: Arc<dyn JitterSource>,
    state: Mutex<QueueState>,
}

impl RequestQueue {
    /// Create a queue with its backoff at the configured base
    pub fn new(provider: ProviderId, config: QueueConfig, jitter: Arc<dyn JitterSource>) -> Self {
        let backoff = config.base_backoff();
        Self {
            provider,
            config,
            jitter,
            state: Mutex::new(QueueState {
                last_started: None,
                cooldown_until: None,
                backoff,
            }),
        }
    }

    /// Execute `request` under the queue's serialization and spacing rules.
    ///
    /// Suspends (never fails fast) through any active cooldown window, then
    /// waits out the minimum inter-request interval, then runs the request
    /// under the configured upper-bound timeout. A rate-limit result doubles
    /// the backoff (capped), opens a jittered cooldown window, and the
    /// distinguishable error propagates to the caller. A success resets the
    /// backoff to its base.
    pub async fn run<T, F, Fut>(&self, request: F) -> Result<T, ProviderError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut state = self.state.lock().await;

        if let Some(until) = state.cooldown_until {
            if until > Instant::now() {
                debug!(
                    provider = %self.provider,
                    wait_ms = (until - Instant::now()).as_millis() as u64,
                    "queue suspended for cooldown"
                );
                sleep_until(until).await;
            }
            state.cooldown_until = None;
        }

        if let Some(last) = state.last_started {
            let earliest = last + self.config.min_interval();
            if earliest > Instant::now() {
                sleep_until(earliest).await;
            }
        }

        state.last_started = Some(Instant::now());

        let request_timeout = self.config.request_timeout();
        let result = match timeout(request_timeout, request()).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                provider: self.provider.as_str(),
                elapsed_ms: request_timeout.as_millis() as u64,
            }),
        };

        match &result {
            Ok(_) => {
                state.backoff = self.config.base_backoff();
            }
            Err(error) if error.is_rate_limited() => {
                state.backoff = (state.backoff * 2).min(self.config.max_backoff());
                let jittered =
                    state.backoff + state.backoff.mul_f64(0.3 * self.jitter.fraction());
                state.cooldown_until = Some(Instant::now() + jittered);
                warn!(
                    provider = %self.provider,
                    backoff_ms = state.backoff.as_millis() as u64,
                    "rate limited, cooling down"
                );
            }
            Err(_) => {}
        }

        result
    }

    /// Current backoff duration (introspection)
    pub async fn current_backoff(&self) -> Duration {
        self.state.lock().await.backoff
    }

    /// Remaining cooldown, if a window is active
    pub async fn cooldown_remaining(&self) -> Option<Duration> {
        let state = self.state.lock().await;
        state
            .cooldown_until
            .map(|until| until.saturating_duration_since(Instant::now()))
            .filter(|d| !d.is_zero())
    }
}
