//! Crate-level error type
//!
//! Every fallible public operation returns [`Result`]. The only failure the
//! account-creation cascade surfaces to callers is
//! [`GatewayError::AllProvidersUnavailable`]; everything else is either
//! absorbed by retry/rotation or propagated verbatim from a pinned dispatch.

use crate::core::providers::ProviderError;
use thiserror::Error;

/// Result type alias for the gateway
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Main error type for the gateway
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider errors escaping a pinned (non-retried) dispatch
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The retry cascade exhausted every candidate provider
    #[error("All providers unavailable after {attempts} attempts: {last_error}")]
    AllProvidersUnavailable {
        /// Total attempts made across the cascade
        attempts: u32,
        /// Message of the last provider failure observed
        last_error: String,
    },

    /// Unknown provider name in configuration or persisted state
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// No account exists where one is required
    #[error("No account available: {0}")]
    NoAccount(String),

    /// Storage collaborator errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// True when the error is the cascade's terminal "nothing left to try"
    pub fn is_exhausted(&self) -> bool {
        matches!(self, GatewayError::AllProvidersUnavailable { .. })
    }
}
