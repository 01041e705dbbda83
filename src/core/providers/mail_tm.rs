//! mail.tm adapter
//!
//! REST API with JWT bearer auth. Accounts are created with a throwaway
//! password; the login token is cached per address and refreshed once on a
//! 401 before the failure is surfaced.

use super::base_provider::MailProvider;
use super::error::ProviderError;
use super::shared::{error_for_status, parse_rfc3339, random_local_part};
use crate::core::types::{Account, Message, ProviderId};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const PROVIDER: &str = "mail_tm";
const DEFAULT_BASE_URL: &str = "https://api.mail.tm";

/// mail.tm REST adapter
pub struct MailTmProvider {
    client: Client,
    base_url: String,
    account_ttl: Duration,
    /// Refreshed bearer tokens by address; the token baked into the account's
    /// credential blob is only the initial one
    tokens: DashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct DomainList {
    #[serde(rename = "hydra:member")]
    member: Vec<Domain>,
}

#[derive(Debug, Deserialize)]
struct Domain {
    domain: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(rename = "hydra:member")]
    member: Vec<WireMessage>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    id: String,
    from: WireAddress,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    intro: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    html: Vec<String>,
    #[serde(rename = "createdAt")]
    created_at: String,
    #[serde(default)]
    seen: bool,
}

#[derive(Debug, Deserialize)]
struct WireAddress {
    #[serde(default)]
    address: String,
}

impl WireMessage {
    fn into_message(self) -> Message {
        Message {
            received_at: parse_rfc3339(&self.created_at),
            body: self.text.unwrap_or(self.intro),
            html_body: self.html.into_iter().next(),
            id: self.id,
            from: self.from.address,
            subject: self.subject,
            read: self.seen,
        }
    }
}

impl MailTmProvider {
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
            tokens: DashMap::new(),
        }
    }

    async fn first_domain(&self) -> Result<String, ProviderError> {
        let response = self
            .client
            .get(format!("{}/domains", self.base_url))
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;

        if !response.status().is_success() {
            return Err(error_for_status(PROVIDER, response).await);
        }

        let domains: DomainList = response
            .json()
            .await
            .map_err(|e| ProviderError::serialization(PROVIDER, e.to_string()))?;

        domains
            .member
            .into_iter()
            .next()
            .map(|d| d.domain)
            .ok_or_else(|| ProviderError::api(PROVIDER, 200, "no domains offered"))
    }

    async fn login(&self, address: &str, password: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(format!("{}/token", self.base_url))
            .json(&json!({ "address": address, "password": password }))
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;

        if !response.status().is_success() {
            return Err(error_for_status(PROVIDER, response).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::serialization(PROVIDER, e.to_string()))?;
        self.tokens.insert(address.to_string(), token.token.clone());
        Ok(token.token)
    }

    fn cached_token(&self, account: &Account) -> Option<String> {
        self.tokens
            .get(&account.address)
            .map(|t| t.clone())
            .or_else(|| {
                account
                    .credentials
                    .get("token")
                    .and_then(|t| t.as_str())
                    .map(String::from)
            })
    }

    fn password(account: &Account) -> Result<String, ProviderError> {
        account
            .credentials
            .get("password")
            .and_then(|p| p.as_str())
            .map(String::from)
            .ok_or_else(|| {
                ProviderError::authentication(PROVIDER, "credential blob is missing the password")
            })
    }

    /// Execute an authenticated GET/DELETE, re-authenticating once on a 401
    async fn authed(
        &self,
        account: &Account,
        method: reqwest::Method,
        path: &str,
    ) -> Result<reqwest::Response, ProviderError> {
        let token = match self.cached_token(account) {
            Some(token) => token,
            None => self.login(&account.address, &Self::password(account)?).await?,
        };

        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .request(method.clone(), &url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;

        if response.status().as_u16() != 401 {
            return Ok(response);
        }

        // Expired token: one re-auth, then surface whatever comes back.
        debug!(provider = PROVIDER, "token rejected, re-authenticating");
        self.tokens.remove(&account.address);
        let token = self.login(&account.address, &Self::password(account)?).await?;
        self.client
            .request(method, &url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))
    }
}

#[async_trait]
impl MailProvider for MailTmProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn create_account(&self, prefix: Option<&str>) -> Result<Account, ProviderError> {
        let domain = self.first_domain().await?;
        let address = format!("{}@{}", random_local_part(prefix), domain);
        let password = uuid::Uuid::new_v4().to_string();

        let response = self
            .client
            .post(format!("{}/accounts", self.base_url))
            .json(&json!({ "address": address, "password": password }))
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;

        if !response.status().is_success() {
            return Err(error_for_status(PROVIDER, response).await);
        }

        let token = self.login(&address, &password).await?;
        let now = Utc::now();

        Ok(Account {
            address,
            provider: ProviderId::MailTm,
            created_at: now,
            expires_at: now + self.account_ttl,
            credentials: json!({ "password": password, "token": token }),
        })
    }

    async fn list_messages(&self, account: &Account) -> Result<Vec<Message>, ProviderError> {
        let response = self.authed(account, reqwest::Method::GET, "/messages").await?;

        if !response.status().is_success() {
            return Err(error_for_status(PROVIDER, response).await);
        }

        let list: MessageList = response
            .json()
            .await
            .map_err(|e| ProviderError::serialization(PROVIDER, e.to_string()))?;

        Ok(list.member.into_iter().map(WireMessage::into_message).collect())
    }

    async fn read_message(&self, account: &Account, id: &str) -> Result<Message, ProviderError> {
        let response = self
            .authed(account, reqwest::Method::GET, &format!("/messages/{}", id))
            .await?;

        if response.status().as_u16() == 404 {
            return Err(ProviderError::MessageNotFound {
                provider: PROVIDER,
                id: id.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(error_for_status(PROVIDER, response).await);
        }

        let wire: WireMessage = response
            .json()
            .await
            .map_err(|e| ProviderError::serialization(PROVIDER, e.to_string()))?;
        Ok(wire.into_message())
    }

    async fn delete_message(&self, account: &Account, id: &str) -> Result<(), ProviderError> {
        let response = self
            .authed(account, reqwest::Method::DELETE, &format!("/messages/{}", id))
            .await?;

        if response.status().is_success() || response.status().as_u16() == 404 {
            Ok(())
        } else {
            Err(error_for_status(PROVIDER, response).await)
        }
    }
}
