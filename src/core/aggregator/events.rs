//! Account lifecycle events
//!
//! Provider rotation on a rate-limited inbox check is deliberately invisible
//! in the return value (the call yields an empty list and the next poll sees
//! the new address). These events make that rotation observable so a UI can
//! notify instead of silently watching the address change.

use crate::core::types::{Account, ProviderId};

/// Events emitted by the gateway's account lifecycle
#[derive(Debug, Clone)]
pub enum AccountEvent {
    /// A new account was created and became the current account
    Created {
        /// The new current account
        account: Account,
    },
    /// The current account was abandoned on a rate-limited provider and
    /// replaced on a different one
    Rotated {
        /// Provider the abandoned account lived on
        from: ProviderId,
        /// The replacement current account
        account: Account,
    },
}
