//! Error handling for the gateway
//!
//! This module defines the crate-level error type. Adapter-level errors live in
//! [`crate::core::providers::ProviderError`] and are wrapped here once they
//! escape the retry machinery.

pub mod error;

pub use error::{GatewayError, Result};
