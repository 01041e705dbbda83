//! Health tracker implementation

use super::types::{CircuitState, ProviderHealthRecord, ProviderHealthSnapshot};
use crate::config::HealthConfig;
use crate::core::types::ProviderId;
use crate::utils::jitter::JitterSource;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Rolling health tracker with per-provider circuit breaking.
///
/// Every operation is synchronous and completes without suspending, so a
/// record's read-modify-write can never interleave with another task's: the
/// dashmap entry guard is the only lock and it is never held across an
/// `.await`.
pub struct HealthTracker {
    config: HealthConfig,
    /// Static preference order; position feeds the score's priority bonus
    priority: Vec<ProviderId>,
    jitter: Arc<dyn JitterSource>,
    records: DashMap<ProviderId, ProviderHealthRecord>,
}

impl HealthTracker {
    /// Create a tracker for the given provider set in preference order
    pub fn new(
        config: HealthConfig,
        priority: Vec<ProviderId>,
        jitter: Arc<dyn JitterSource>,
    ) -> Self {
        Self {
            config,
            priority,
            jitter,
            records: DashMap::new(),
        }
    }

    /// The provider set this tracker scores, in preference order
    pub fn providers(&self) -> &[ProviderId] {
        &self.priority
    }

    /// Record a successful request.
    ///
    /// Always closes the circuit and resets the failure streak, regardless of
    /// prior state.
    pub fn record_success(&self, provider: ProviderId, response_time_ms: u64) {
        let mut record = self.records.entry(provider).or_default();
        let decay = self.config.success_rate_decay;
        let rt_decay = self.config.response_time_decay;

        record.total_requests += 1;
        record.total_successes += 1;
        record.consecutive_failures = 0;
        record.last_success_at = Instant::now();
        record.last_error = None;
        record.circuit = CircuitState::Closed;
        record.success_rate = record.success_rate * decay + (1.0 - decay);
        record.avg_response_time_ms =
            record.avg_response_time_ms * rt_decay + response_time_ms as f64 * (1.0 - rt_decay);

        debug!(
            provider = %provider,
            response_time_ms,
            success_rate = record.success_rate,
            "recorded success"
        );
    }

    /// Record a failed request.
    ///
    /// Failures decay the success rate multiplicatively (no additive floor),
    /// so they pull the average down faster than successes pull it up. When
    /// the streak crosses the breaker threshold the circuit opens with an
    /// exponentially growing, jittered cooldown.
    pub fn record_failure(&self, provider: ProviderId, error: &str) {
        let mut record = self.records.entry(provider).or_default();

        record.total_requests += 1;
        record.consecutive_failures += 1;
        record.last_failure_at = Some(Instant::now());
        record.last_error = Some(error.to_string());
        record.success_rate *= self.config.success_rate_decay;

        if record.consecutive_failures >= self.config.breaker_threshold {
            let cooldown = self.circuit_cooldown(record.consecutive_failures);
            record.circuit = CircuitState::Open {
                until: Instant::now() + cooldown,
            };
            warn!(
                provider = %provider,
                consecutive_failures = record.consecutive_failures,
                cooldown_ms = cooldown.as_millis() as u64,
                error,
                "circuit opened"
            );
        } else {
            debug!(
                provider = %provider,
                consecutive_failures = record.consecutive_failures,
                error,
                "recorded failure"
            );
        }
    }

    /// Whether the provider is currently routable.
    ///
    /// An elapsed cooldown window counts as a half-open probe: the circuit is
    /// optimistically closed and the provider reported available. The failure
    /// streak is deliberately left intact so a failed probe reopens with a
    /// larger window.
    pub fn is_available(&self, provider: ProviderId) -> bool {
        let mut record = self.records.entry(provider).or_default();
        match record.circuit {
            CircuitState::Closed => true,
            CircuitState::Open { until } => {
                if Instant::now() >= until {
                    record.circuit = CircuitState::Closed;
                    info!(provider = %provider, "cooldown elapsed, permitting half-open probe");
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Desirability score, higher is better. Unavailable providers score -100.
    pub fn score(&self, provider: ProviderId) -> f64 {
        if !self.is_available(provider) {
            return -100.0;
        }

        let record = self.records.entry(provider).or_default();

        let success_component = record.success_rate * 40.0;

        let minutes_since_success = record.last_success_at.elapsed().as_secs_f64() / 60.0;
        let recency_bonus = (20.0 - minutes_since_success).max(0.0);

        let response_penalty = (record.avg_response_time_ms / 100.0).min(20.0);

        let priority_bonus = self
            .priority
            .iter()
            .position(|p| *p == provider)
            .map(|rank| 2.0 * (self.priority.len() - rank) as f64)
            .unwrap_or(0.0);

        let failure_penalty = 1.5_f64.powi(record.consecutive_failures as i32) * 5.0;

        (success_component + recency_bonus - response_penalty + priority_bonus - failure_penalty)
            .clamp(-100.0, 100.0)
    }

    /// Best available provider outside `exclude`, or `None` when nothing
    /// qualifies. Ties break toward the static preference order.
    pub fn best_provider(&self, exclude: &[ProviderId]) -> Option<ProviderId> {
        let mut best: Option<(ProviderId, f64)> = None;
        for &provider in &self.priority {
            if exclude.contains(&provider) || !self.is_available(provider) {
                continue;
            }
            let score = self.score(provider);
            // Strict comparison keeps the earlier (preferred) provider on ties
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((provider, score));
            }
        }
        best.map(|(provider, _)| provider)
    }

    /// Delay before cross-provider retry attempt `attempt` (0-based):
    /// exponential with 0-30% jitter, capped.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let base = self.config.retry_base_delay();
        let exp = attempt.min(16);
        let raw = base.saturating_mul(1u32 << exp);
        let jittered = raw.mul_f64(1.0 + 0.3 * self.jitter.fraction());
        jittered.min(self.config.retry_max_delay())
    }

    /// Operator escape hatch: replace the provider's record with defaults
    pub fn reset_provider(&self, provider: ProviderId) {
        self.records.insert(provider, ProviderHealthRecord::new());
        info!(provider = %provider, "health record reset");
    }

    /// Reset every tracked provider
    pub fn reset_all(&self) {
        for &provider in &self.priority {
            self.reset_provider(provider);
        }
    }

    /// Clone of a provider's raw record (introspection and tests)
    pub fn record(&self, provider: ProviderId) -> ProviderHealthRecord {
        self.records.entry(provider).or_default().clone()
    }

    /// Point-in-time health view of every provider, in preference order
    pub fn snapshot(&self) -> Vec<ProviderHealthSnapshot> {
        self.priority
            .iter()
            .map(|&provider| {
                let available = self.is_available(provider);
                let score = self.score(provider);
                let record = self.record(provider);
                let cooldown_remaining_ms = match record.circuit {
                    CircuitState::Open { until } => Some(
                        until
                            .saturating_duration_since(Instant::now())
                            .as_millis() as u64,
                    ),
                    CircuitState::Closed => None,
                };
                ProviderHealthSnapshot {
                    provider,
                    available,
                    score,
                    success_rate: record.success_rate,
                    consecutive_failures: record.consecutive_failures,
                    avg_response_time_ms: record.avg_response_time_ms,
                    cooldown_remaining_ms,
                    total_requests: record.total_requests,
                    total_successes: record.total_successes,
                    last_error: record.last_error,
                }
            })
            .collect()
    }

    /// Cooldown for a circuit opening with `failures` consecutive failures:
    /// `min(base * 2^(failures - 1), max)`, jittered by up to 30%.
    fn circuit_cooldown(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1).min(16);
        let raw = self
            .config
            .cooldown_base()
            .saturating_mul(1u32 << exp)
            .min(self.config.cooldown_max());
        raw.mul_f64(1.0 + 0.3 * self.jitter.fraction())
    }
}
