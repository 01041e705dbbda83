//! DropMail adapter
//!
//! GraphQL sessions API. A session owns one or more addresses and buffers
//! inbound mail; the session id is the only credential. DropMail has no
//! per-message fetch or delete, so reads go through the session's mail list
//! and deletes fall back to the best-effort no-op contract.

use super::base_provider::MailProvider;
use super::error::ProviderError;
use super::shared::{error_for_status, parse_rfc3339};
use crate::core::types::{Account, Message, ProviderId};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

const PROVIDER: &str = "dropmail";
const DEFAULT_BASE_URL: &str = "https://dropmail.me/api/graphql";

/// DropMail GraphQL adapter
pub struct DropMailProvider {
    client: Client,
    base_url: String,
    account_ttl: Duration,
    /// Client token appended to the endpoint path, as the API requires
    api_token: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct IntroduceSessionData {
    #[serde(rename = "introduceSession")]
    session: WireSession,
}

#[derive(Debug, Deserialize)]
struct SessionData {
    session: Option<WireMailbox>,
}

#[derive(Debug, Deserialize)]
struct WireSession {
    id: String,
    addresses: Vec<WireAddress>,
}

#[derive(Debug, Deserialize)]
struct WireAddress {
    address: String,
}

#[derive(Debug, Deserialize)]
struct WireMailbox {
    #[serde(default)]
    mails: Vec<WireMail>,
}

#[derive(Debug, Deserialize)]
struct WireMail {
    id: String,
    #[serde(rename = "fromAddr", default)]
    from_addr: String,
    #[serde(rename = "headerSubject", default)]
    header_subject: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    html: Option<String>,
    #[serde(rename = "receivedAt", default)]
    received_at: Option<String>,
}

impl WireMail {
    fn into_message(self) -> Message {
        Message {
            id: self.id,
            from: self.from_addr,
            subject: self.header_subject.unwrap_or_default(),
            received_at: self
                .received_at
                .as_deref()
                .map(parse_rfc3339)
                .unwrap_or_else(Utc::now),
            body: self.text.unwrap_or_default(),
            html_body: self.html,
            // The API has no read flag; everything surfaces as unread
            read: false,
        }
    }
}

impl DropMailProvider {
    /// Create an adapter against the public API with a fresh client token
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
            api_token: uuid::Uuid::new_v4().simple().to_string(),
        }
    }

    fn session_id(account: &Account) -> Result<String, ProviderError> {
        account
            .credentials
            .get("session_id")
            .and_then(|s| s.as_str())
            .map(String::from)
            .ok_or_else(|| {
                ProviderError::authentication(PROVIDER, "credential blob is missing the session id")
            })
    }

    async fn query<T: serde::de::DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, ProviderError> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, self.api_token))
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;

        if !response.status().is_success() {
            return Err(error_for_status(PROVIDER, response).await);
        }

        let body: GraphQlResponse<T> = response
            .json()
            .await
            .map_err(|e| ProviderError::serialization(PROVIDER, e.to_string()))?;

        if let Some(error) = body.errors.into_iter().next() {
            // GraphQL transports rate limiting in-band rather than as a 429
            return Err(if error.message.to_lowercase().contains("rate limit") {
                ProviderError::rate_limited(PROVIDER, None)
            } else {
                ProviderError::api(PROVIDER, 200, error.message)
            });
        }

        body.data
            .ok_or_else(|| ProviderError::serialization(PROVIDER, "response carried no data"))
    }

    async fn session_mails(&self, account: &Account) -> Result<Vec<Message>, ProviderError> {
        let session_id = Self::session_id(account)?;
        let data: SessionData = self
            .query(
                "query ($id: ID!) { session(id: $id) { mails { \
                 id, fromAddr, headerSubject, text, html, receivedAt } } }",
                json!({ "id": session_id }),
            )
            .await?;

        let mailbox = data.session.ok_or_else(|| {
            // Sessions expire server-side after ~10 minutes of inactivity
            ProviderError::authentication(PROVIDER, "session expired or unknown")
        })?;

        Ok(mailbox.mails.into_iter().map(WireMail::into_message).collect())
    }
}

#[async_trait]
impl MailProvider for DropMailProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn create_account(&self, _prefix: Option<&str>) -> Result<Account, ProviderError> {
        // DropMail assigns addresses; prefixes are not supported on this API.
        let data: IntroduceSessionData = self
            .query(
                "mutation { introduceSession { id, addresses { address } } }",
                json!({}),
            )
            .await?;

        let address = data
            .session
            .addresses
            .into_iter()
            .next()
            .map(|a| a.address)
            .ok_or_else(|| ProviderError::api(PROVIDER, 200, "session carried no address"))?;

        let now = Utc::now();
        Ok(Account {
            address,
            provider: ProviderId::DropMail,
            created_at: now,
            expires_at: now + self.account_ttl,
            credentials: json!({ "session_id": data.session.id }),
        })
    }

    async fn list_messages(&self, account: &Account) -> Result<Vec<Message>, ProviderError> {
        self.session_mails(account).await
    }

    async fn read_message(&self, account: &Account, id: &str) -> Result<Message, ProviderError> {
        self.session_mails(account)
            .await?
            .into_iter()
            .find(|m| m.id == id)
            .ok_or_else(|| ProviderError::MessageNotFound {
                provider: PROVIDER,
                id: id.to_string(),
            })
    }
}
