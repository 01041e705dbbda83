//! Gateway configuration
//!
//! Typed knobs for every component, each with the documented default. Loading
//! layers three sources: built-in defaults, an optional TOML file, and
//! `TEMPMAIL__*` environment overrides (e.g.
//! `TEMPMAIL__AGGREGATOR__MAX_ATTEMPTS=6`).

use crate::core::types::ProviderId;
use crate::utils::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Enabled providers in static preference order. Position feeds the
    /// health score's priority bonus and breaks score ties.
    pub providers: Vec<ProviderId>,
    /// Health tracker and circuit breaker knobs
    pub health: HealthConfig,
    /// Per-provider request queue knobs
    pub queue: QueueConfig,
    /// Aggregator façade knobs
    pub aggregator: AggregatorConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            providers: ProviderId::ALL.to_vec(),
            health: HealthConfig::default(),
            queue: QueueConfig::default(),
            aggregator: AggregatorConfig::default(),
        }
    }
}

/// Health tracker and circuit breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Consecutive failures that open the circuit
    pub breaker_threshold: u32,
    /// Base circuit cooldown in seconds (doubles per failure past threshold)
    pub cooldown_base_secs: u64,
    /// Circuit cooldown ceiling in seconds
    pub cooldown_max_secs: u64,
    /// EWMA decay for the success rate
    pub success_rate_decay: f64,
    /// EWMA decay for the average response time
    pub response_time_decay: f64,
    /// Base cross-provider retry delay in milliseconds
    pub retry_base_delay_ms: u64,
    /// Cross-provider retry delay ceiling in milliseconds
    pub retry_max_delay_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            breaker_threshold: 3,
            cooldown_base_secs: 30,
            cooldown_max_secs: 30 * 60,
            success_rate_decay: 0.9,
            response_time_decay: 0.8,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 10_000,
        }
    }
}

impl HealthConfig {
    /// Base circuit cooldown as a [`Duration`]
    pub fn cooldown_base(&self) -> Duration {
        Duration::from_secs(self.cooldown_base_secs)
    }

    /// Circuit cooldown ceiling as a [`Duration`]
    pub fn cooldown_max(&self) -> Duration {
        Duration::from_secs(self.cooldown_max_secs)
    }

    /// Base retry delay as a [`Duration`]
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// Retry delay ceiling as a [`Duration`]
    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }
}

/// Per-provider request queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Minimum spacing between requests to one provider, in milliseconds,
    /// measured from the previous request's start
    pub min_interval_ms: u64,
    /// Base queue backoff in milliseconds (doubles per rate-limit signal)
    pub base_backoff_ms: u64,
    /// Queue backoff ceiling in milliseconds
    pub max_backoff_ms: u64,
    /// Upper-bound timeout applied to every adapter call, in seconds
    pub request_timeout_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 2_000,
            base_backoff_ms: 2_000,
            max_backoff_ms: 30_000,
            request_timeout_secs: 30,
        }
    }
}

impl QueueConfig {
    /// Minimum inter-request interval as a [`Duration`]
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    /// Base backoff as a [`Duration`]
    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }

    /// Backoff ceiling as a [`Duration`]
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    /// Per-call timeout as a [`Duration`]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Aggregator façade configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Hard ceiling on total attempts in one account-creation cascade
    pub max_attempts: u32,
    /// Bounded account history length (most-recent-first)
    pub history_cap: usize,
    /// Default account lifetime in minutes
    pub account_ttl_minutes: i64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            history_cap: 50,
            account_ttl_minutes: 60,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from defaults, an optional file, and environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder().add_source(
            config::Config::try_from(&GatewayConfig::default())
                .map_err(|e| GatewayError::Config(e.to_string()))?,
        );

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("TEMPMAIL")
                .separator("__")
                .try_parsing(true),
        );

        let loaded: GatewayConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Check cross-field invariants
    pub fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            return Err(GatewayError::Config(
                "at least one provider must be enabled".to_string(),
            ));
        }
        let mut seen = self.providers.clone();
        seen.sort_by_key(|p| p.as_str());
        seen.dedup();
        if seen.len() != self.providers.len() {
            return Err(GatewayError::Config(
                "provider list contains duplicates".to_string(),
            ));
        }
        if self.aggregator.max_attempts == 0 {
            return Err(GatewayError::Config(
                "aggregator.max_attempts must be at least 1".to_string(),
            ));
        }
        for (name, decay) in [
            ("health.success_rate_decay", self.health.success_rate_decay),
            ("health.response_time_decay", self.health.response_time_decay),
        ] {
            if !(0.0..1.0).contains(&decay) {
                return Err(GatewayError::Config(format!(
                    "{} must be in [0, 1), got {}",
                    name, decay
                )));
            }
        }
        if self.queue.base_backoff_ms == 0 || self.queue.base_backoff_ms > self.queue.max_backoff_ms
        {
            return Err(GatewayError::Config(
                "queue backoff base must be non-zero and not exceed the max".to_string(),
            ));
        }
        Ok(())
    }

    /// Static priority rank of a provider: 0 is most preferred, `None` when
    /// the provider is not enabled
    pub fn priority_rank(&self, provider: ProviderId) -> Option<usize> {
        self.providers.iter().position(|p| *p == provider)
    }
}
