//! Normalized inbox message
//!
//! Adapters translate their heterogeneous wire formats into this shape. The
//! gateway never mutates a message after construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized inbox entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Provider-scoped message id
    pub id: String,
    /// Sender address
    pub from: String,
    /// Subject line
    pub subject: String,
    /// Time the message was received
    pub received_at: DateTime<Utc>,
    /// Plain-text body; may be empty for list responses that only carry
    /// headers until the message is read
    pub body: String,
    /// HTML body when the provider supplies one
    pub html_body: Option<String>,
    /// Read flag as reported by the provider
    pub read: bool,
}
