//! Typed adapter errors
//!
//! Adapters tag every failure with the provider name and a variant the
//! aggregator can branch on. The one distinction that drives behavior is
//! rate-limited vs. everything else: rate limits escalate the owning queue's
//! cooldown and, on inbox reads, trigger silent account rotation.

use thiserror::Error;

/// Error type shared by all provider adapters
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Authentication failed after the adapter's single re-auth attempt
    #[error("Authentication failed for {provider}: {message}")]
    Authentication {
        provider: &'static str,
        message: String,
    },

    /// HTTP 429 or a provider-specific rate-limit signal
    #[error("Rate limit exceeded for {provider}: {message}")]
    RateLimited {
        provider: &'static str,
        message: String,
        /// Server-requested wait, when the response carried one
        retry_after: Option<u64>,
    },

    /// Connection-level failure (reset, DNS, TLS)
    #[error("Network error for {provider}: {message}")]
    Network {
        provider: &'static str,
        message: String,
    },

    /// The call exceeded its upper-bound timeout
    #[error("Timeout for {provider} after {elapsed_ms}ms")]
    Timeout {
        provider: &'static str,
        elapsed_ms: u64,
    },

    /// Non-429 HTTP error status
    #[error("API error from {provider} (status {status}): {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    /// Response body did not match the expected wire format
    #[error("Serialization error for {provider}: {message}")]
    Serialization {
        provider: &'static str,
        message: String,
    },

    /// Requested message does not exist on this provider
    #[error("Message '{id}' not found on {provider}")]
    MessageNotFound { provider: &'static str, id: String },

    /// Operation not supported by this provider (best-effort contract)
    #[error("Operation '{operation}' not supported by {provider}")]
    NotSupported {
        provider: &'static str,
        operation: String,
    },
}

impl ProviderError {
    /// Create an authentication error
    pub fn authentication(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Authentication {
            provider,
            message: message.into(),
        }
    }

    /// Create a rate limit error
    pub fn rate_limited(provider: &'static str, retry_after: Option<u64>) -> Self {
        Self::RateLimited {
            provider,
            message: match retry_after {
                Some(seconds) => format!("retry after {} seconds", seconds),
                None => "no retry-after supplied".to_string(),
            },
            retry_after,
        }
    }

    /// Create a network error
    pub fn network(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Network {
            provider,
            message: message.into(),
        }
    }

    /// Create an API error from a status code and body
    pub fn api(provider: &'static str, status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            provider,
            status,
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Serialization {
            provider,
            message: message.into(),
        }
    }

    /// The provider name this error was tagged with
    pub fn provider(&self) -> &'static str {
        match self {
            Self::Authentication { provider, .. }
            | Self::RateLimited { provider, .. }
            | Self::Network { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::Api { provider, .. }
            | Self::Serialization { provider, .. }
            | Self::MessageNotFound { provider, .. }
            | Self::NotSupported { provider, .. } => provider,
        }
    }

    /// Whether this is a rate-limit-class error (429 or equivalent)
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Api { status: 429, .. }
        )
    }

    /// Map a reqwest transport error into the taxonomy
    pub fn from_reqwest(provider: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                provider,
                elapsed_ms: 0,
            }
        } else if err.is_connect() || err.is_request() {
            Self::network(provider, err.to_string())
        } else if err.is_decode() {
            Self::serialization(provider, err.to_string())
        } else {
            Self::network(provider, err.to_string())
        }
    }
}
