//! Health record types

use crate::core::types::ProviderId;
use serde::Serialize;
use tokio::time::Instant;

/// Circuit breaker state for one provider.
///
/// The half-open state is implicit: the first availability check after an
/// `Open` window elapses collapses the state back to `Closed` and permits a
/// trial request. A failure on that trial reopens with a larger window
/// because the failure streak was not reset by the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Provider is routable
    Closed,
    /// Provider is unavailable until the window elapses
    Open {
        /// End of the cooldown window
        until: Instant,
    },
}

/// Rolling health record for one provider.
///
/// Created lazily on first use, mutated only by the tracker, never destroyed;
/// an operator reset replaces it with fresh defaults.
#[derive(Debug, Clone)]
pub struct ProviderHealthRecord {
    /// Exponentially-weighted success rate in `[0, 1]`, seeded optimistic
    pub success_rate: f64,
    /// Failures since the last success
    pub consecutive_failures: u32,
    /// Time of the last success, seeded "now" so a fresh provider starts
    /// with full recency credit
    pub last_success_at: Instant,
    /// Time of the last failure
    pub last_failure_at: Option<Instant>,
    /// Last failure's message, cleared on success
    pub last_error: Option<String>,
    /// Exponentially-weighted response time in milliseconds, neutral seed
    pub avg_response_time_ms: f64,
    /// Circuit breaker state
    pub circuit: CircuitState,
    /// Lifetime request count
    pub total_requests: u64,
    /// Lifetime success count
    pub total_successes: u64,
}

impl ProviderHealthRecord {
    /// Neutral seed for the response-time average
    pub const NEUTRAL_RESPONSE_TIME_MS: f64 = 500.0;

    /// Fresh optimistic record
    pub fn new() -> Self {
        Self {
            success_rate: 1.0,
            consecutive_failures: 0,
            last_success_at: Instant::now(),
            last_failure_at: None,
            last_error: None,
            avg_response_time_ms: Self::NEUTRAL_RESPONSE_TIME_MS,
            circuit: CircuitState::Closed,
            total_requests: 0,
            total_successes: 0,
        }
    }

    /// Whether the circuit is currently open (ignoring probe eligibility)
    pub fn circuit_open(&self) -> bool {
        matches!(self.circuit, CircuitState::Open { .. })
    }
}

impl Default for ProviderHealthRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable point-in-time view of one provider's health
#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealthSnapshot {
    /// Provider identity
    pub provider: ProviderId,
    /// Whether the provider is currently routable
    pub available: bool,
    /// Desirability score at snapshot time
    pub score: f64,
    /// Rolling success rate
    pub success_rate: f64,
    /// Failures since the last success
    pub consecutive_failures: u32,
    /// Rolling average response time in milliseconds
    pub avg_response_time_ms: f64,
    /// Remaining cooldown in milliseconds, when the circuit is open
    pub cooldown_remaining_ms: Option<u64>,
    /// Lifetime request count
    pub total_requests: u64,
    /// Lifetime success count
    pub total_successes: u64,
    /// Last failure's message
    pub last_error: Option<String>,
}
