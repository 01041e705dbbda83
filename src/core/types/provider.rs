//! Provider identity
//!
//! The set of backing mailbox services is fixed at process start. Identities
//! are plain `Copy` values so they can be passed around freely and used as
//! map keys without allocation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of one backing mailbox service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    /// mail.tm REST API (JWT bearer auth)
    MailTm,
    /// Guerrilla Mail session-token JSON API
    GuerrillaMail,
    /// DropMail GraphQL sessions API
    DropMail,
}

impl ProviderId {
    /// All known providers in default preference order
    pub const ALL: [ProviderId; 3] = [
        ProviderId::MailTm,
        ProviderId::GuerrillaMail,
        ProviderId::DropMail,
    ];

    /// Stable string name used in logs, config, and persisted state
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::MailTm => "mail_tm",
            ProviderId::GuerrillaMail => "guerrilla_mail",
            ProviderId::DropMail => "dropmail",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mail_tm" | "mail.tm" => Ok(ProviderId::MailTm),
            "guerrilla_mail" | "guerrillamail" => Ok(ProviderId::GuerrillaMail),
            "dropmail" | "dropmail.me" => Ok(ProviderId::DropMail),
            other => Err(format!("unknown provider: {}", other)),
        }
    }
}
