//! Guerrilla Mail adapter
//!
//! Single-endpoint JSON API driven by an `f=` function parameter and a
//! `sid_token` session carried in the account's credential blob. Sessions do
//! not need a password, so there is no re-auth path; a dead session surfaces
//! as an authentication failure and the account rotates.

use super::base_provider::MailProvider;
use super::error::ProviderError;
use super::shared::{error_for_status, parse_unix_seconds};
use crate::core::types::{Account, Message, ProviderId};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

const PROVIDER: &str = "guerrilla_mail";
const DEFAULT_BASE_URL: &str = "https://api.guerrillamail.com/ajax.php";

/// Guerrilla Mail adapter
pub struct GuerrillaProvider {
    client: Client,
    base_url: String,
    account_ttl: Duration,
}

#[derive(Debug, Deserialize)]
struct AddressResponse {
    email_addr: String,
    sid_token: String,
}

#[derive(Debug, Deserialize)]
struct EmailListResponse {
    #[serde(default)]
    list: Vec<WireEmail>,
}

#[derive(Debug, Deserialize)]
struct WireEmail {
    mail_id: serde_json::Value,
    #[serde(default)]
    mail_from: String,
    #[serde(default)]
    mail_subject: String,
    #[serde(default)]
    mail_excerpt: String,
    #[serde(default)]
    mail_body: Option<String>,
    #[serde(default)]
    mail_timestamp: serde_json::Value,
    #[serde(default)]
    mail_read: serde_json::Value,
}

impl WireEmail {
    fn into_message(self) -> Message {
        // Ids and flags arrive as either strings or numbers depending on the
        // endpoint; normalize both.
        let id = match &self.mail_id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let read = match &self.mail_read {
            serde_json::Value::String(s) => s != "0",
            serde_json::Value::Number(n) => n.as_i64() != Some(0),
            serde_json::Value::Bool(b) => *b,
            _ => false,
        };
        Message {
            id,
            from: self.mail_from,
            subject: self.mail_subject,
            received_at: parse_unix_seconds(&self.mail_timestamp),
            body: self.mail_body.unwrap_or(self.mail_excerpt),
            html_body: None,
            read,
        }
    }
}

impl GuerrillaProvider {
    /// Create an adapter against the public API
    pub fn new(client: Client, account_ttl: Duration) -> Self {
        Self::with_base_url(client, account_ttl, DEFAULT_BASE_URL)
    }

    /// Create an adapter against a custom endpoint (tests)
    pub fn with_base_url(
        client: Client,
        account_ttl: Duration,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            account_ttl,
        }
    }

    fn sid_token(account: &Account) -> Result<String, ProviderError> {
        account
            .credentials
            .get("sid_token")
            .and_then(|t| t.as_str())
            .map(String::from)
            .ok_or_else(|| {
                ProviderError::authentication(PROVIDER, "credential blob is missing the sid_token")
            })
    }

    async fn call(&self, params: &[(&str, &str)]) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(params)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;

        if !response.status().is_success() {
            return Err(error_for_status(PROVIDER, response).await);
        }
        Ok(response)
    }

    async fn call_json<T: serde::de::DeserializeOwned>(
        &self,
        params: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        self.call(params)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::serialization(PROVIDER, e.to_string()))
    }
}

#[async_trait]
impl MailProvider for GuerrillaProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn create_account(&self, prefix: Option<&str>) -> Result<Account, ProviderError> {
        let mut session: AddressResponse = self
            .call_json(&[("f", "get_email_address"), ("lang", "en")])
            .await?;

        // The API assigns a random local part; a caller prefix replaces it.
        if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
            let renamed: AddressResponse = self
                .call_json(&[
                    ("f", "set_email_user"),
                    ("email_user", prefix),
                    ("lang", "en"),
                    ("sid_token", &session.sid_token),
                ])
                .await?;
            session.email_addr = renamed.email_addr;
        }

        let now = Utc::now();
        Ok(Account {
            address: session.email_addr,
            provider: ProviderId::GuerrillaMail,
            created_at: now,
            expires_at: now + self.account_ttl,
            credentials: json!({ "sid_token": session.sid_token }),
        })
    }

    async fn list_messages(&self, account: &Account) -> Result<Vec<Message>, ProviderError> {
        let sid = Self::sid_token(account)?;
        let list: EmailListResponse = self
            .call_json(&[
                ("f", "get_email_list"),
                ("offset", "0"),
                ("sid_token", &sid),
            ])
            .await?;

        Ok(list.list.into_iter().map(WireEmail::into_message).collect())
    }

    async fn read_message(&self, account: &Account, id: &str) -> Result<Message, ProviderError> {
        let sid = Self::sid_token(account)?;
        let response = self
            .call(&[("f", "fetch_email"), ("email_id", id), ("sid_token", &sid)])
            .await?;

        // fetch_email answers `false` for unknown ids instead of a 404
        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::serialization(PROVIDER, e.to_string()))?;
        if !value.is_object() {
            return Err(ProviderError::MessageNotFound {
                provider: PROVIDER,
                id: id.to_string(),
            });
        }

        let wire: WireEmail = serde_json::from_value(value)
            .map_err(|e| ProviderError::serialization(PROVIDER, e.to_string()))?;
        Ok(wire.into_message())
    }

    async fn delete_message(&self, account: &Account, id: &str) -> Result<(), ProviderError> {
        let sid = Self::sid_token(account)?;
        self.call(&[("f", "del_email"), ("email_ids[]", id), ("sid_token", &sid)])
            .await?;
        Ok(())
    }
}
