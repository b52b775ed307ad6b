//! Marketplace access-token acquisition.
//!
//! Tokens are published out-of-band as small documents, one per account.
//! Most accounts embed the token in an HTML page behind a text marker; one
//! account publishes a JSON document instead. The account registry decides
//! which shape applies.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{AccountConfig, TokenSource};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::{MarketplaceError, Result};

/// Prefix the marketplace expects on every access token.
const TOKEN_PREFIX: &str = "APP_USR-";

/// A marketplace access token and the account identity derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// Full bearer token.
    pub token: String,
    /// Account identity segment: the token's last `-`-separated part.
    pub user_id: String,
}

impl AccessToken {
    /// Wraps a raw token, deriving the user id from its last segment.
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let user_id = token.rsplit('-').next().unwrap_or("").to_string();
        Self { token, user_id }
    }
}

/// Resolves an account to a marketplace access token.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Fetches the current access token for the account.
    async fn access_token(&self, account: &AccountConfig) -> Result<AccessToken>;
}

/// Token provider reading the published token documents over HTTP.
#[derive(Clone)]
pub struct HttpTokenProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTokenProvider {
    /// Creates a provider reading token documents under `base_url`.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn fetch_document(&self, path: &str) -> Result<String> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MarketplaceError::TokenUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MarketplaceError::TokenUnavailable(format!(
                "token source {url} returned status {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| MarketplaceError::TokenUnavailable(e.to_string()))
    }
}

/// Extracts the token embedded in an HTML token document.
fn extract_marked_token(content: &str) -> Option<String> {
    let start = content.find("y>")? + 2;
    let rest = &content[start..];
    let end = rest.find("</")?;
    Some(format!("{TOKEN_PREFIX}{}", &rest[..end]))
}

#[async_trait]
impl TokenProvider for HttpTokenProvider {
    async fn access_token(&self, account: &AccountConfig) -> Result<AccessToken> {
        let token = match &account.token_source {
            TokenSource::HtmlMarker { key } => {
                let content = self.fetch_document(&format!("tk{key}.html")).await?;
                extract_marked_token(&content).ok_or_else(|| {
                    MarketplaceError::TokenUnavailable(format!(
                        "no token marker in document for account {}",
                        account.name
                    ))
                })?
            }
            TokenSource::JsonDocument { key } => {
                #[derive(Deserialize)]
                struct TokenDocument {
                    data: String,
                }

                let content = self.fetch_document(&format!("tk{key}.txt")).await?;
                let document: TokenDocument = serde_json::from_str(&content).map_err(|e| {
                    MarketplaceError::TokenUnavailable(format!(
                        "malformed token document for account {}: {e}",
                        account.name
                    ))
                })?;
                document.data
            }
        };

        tracing::debug!(account = %account.name, "access token resolved");
        Ok(AccessToken::new(token))
    }
}

/// Fixed token provider for testing.
#[derive(Clone, Default)]
pub struct StaticTokenProvider {
    tokens: Arc<RwLock<HashMap<String, String>>>,
}

impl StaticTokenProvider {
    /// Creates an empty provider; every lookup fails until tokens are set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the token returned for an account.
    pub async fn set_token(&self, account: &str, token: &str) {
        self.tokens
            .write()
            .await
            .insert(account.to_string(), token.to_string());
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self, account: &AccountConfig) -> Result<AccessToken> {
        self.tokens
            .read()
            .await
            .get(&account.name)
            .map(AccessToken::new)
            .ok_or_else(|| {
                MarketplaceError::TokenUnavailable(format!("no token for account {}", account.name))
            })
    }
}
