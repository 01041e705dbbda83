//! Shared utilities
//!
//! Error types and small cross-cutting helpers used by every component.

pub mod error;
pub mod jitter;

pub use error::{GatewayError, Result};
pub use jitter::{JitterSource, NoJitter, ThreadRngJitter};
