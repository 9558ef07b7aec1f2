//! OAuth2 token source
//!
//! Client-credentials and refresh-token grants against an Entra-style
//! authority, with an in-memory token cache keyed by scope set.

use super::authenticator::TokenSource;
use super::types::{AcquiredToken, Account, CachedToken, OAuth2Config};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// OAuth2 token source
pub struct OAuth2TokenSource {
    config: OAuth2Config,
    /// Tokens by space-joined scope list
    cache: Arc<RwLock<HashMap<String, CachedToken>>>,
    /// Current refresh token, rotated when the server issues a new one
    refresh_token: Arc<RwLock<Option<String>>>,
    http_client: Client,
}

impl OAuth2TokenSource {
    /// Create a new source with the given config
    pub fn new(config: OAuth2Config) -> Self {
        Self::with_client(config, Client::new())
    }

    /// Create a source with a custom HTTP client
    pub fn with_client(config: OAuth2Config, http_client: Client) -> Self {
        let refresh_token = config.refresh_token.clone();
        Self {
            config,
            cache: Arc::new(RwLock::new(HashMap::new())),
            refresh_token: Arc::new(RwLock::new(refresh_token)),
            http_client,
        }
    }

    fn account(&self) -> Account {
        Account::new(self.config.client_id.clone())
    }

    fn cache_key(scopes: &[String]) -> String {
        scopes.join(" ")
    }

    async fn store(&self, scopes: &[String], token: CachedToken) {
        self.cache
            .write()
            .await
            .insert(Self::cache_key(scopes), token);
    }

    /// Clear all cached tokens
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    /// Fetch a token using the client credentials flow
    async fn fetch_client_credentials(
        &self,
        client_secret: &str,
        scopes: &[String],
    ) -> Result<CachedToken> {
        let mut form = vec![
            ("grant_type", "client_credentials".to_string()),
            ("client_id", self.config.client_id.clone()),
            ("client_secret", client_secret.to_string()),
        ];
        if !scopes.is_empty() {
            form.push(("scope", scopes.join(" ")));
        }

        let token_response = self.post_token_request(&form).await?;
        Ok(token_response.into_cached_token())
    }

    /// Fetch a token using the refresh token flow
    async fn fetch_refresh(&self, refresh_token: &str, scopes: &[String]) -> Result<CachedToken> {
        let mut form = vec![
            ("grant_type", "refresh_token".to_string()),
            ("client_id", self.config.client_id.clone()),
            ("refresh_token", refresh_token.to_string()),
        ];
        if let Some(secret) = &self.config.client_secret {
            form.push(("client_secret", secret.clone()));
        }
        if !scopes.is_empty() {
            form.push(("scope", scopes.join(" ")));
        }

        let token_response = self.post_token_request(&form).await?;
        if let Some(rotated) = token_response.refresh_token.clone() {
            *self.refresh_token.write().await = Some(rotated);
        }
        Ok(token_response.into_cached_token())
    }

    async fn post_token_request(&self, form: &[(&str, String)]) -> Result<TokenResponse> {
        let response = self
            .http_client
            .post(self.config.token_url())
            .form(form)
            .send()
            .await
            .map_err(Error::Http)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::OAuth2 {
                message: format!("Token request failed with status {status}: {body}"),
            });
        }

        response.json().await.map_err(Error::Http)
    }
}

#[async_trait]
impl TokenSource for OAuth2TokenSource {
    fn accounts(&self) -> Vec<Account> {
        if self.config.client_secret.is_some() || self.config.refresh_token.is_some() {
            vec![self.account()]
        } else {
            Vec::new()
        }
    }

    async fn acquire_silent(&self, _account: &Account, scopes: &[String]) -> Result<CachedToken> {
        {
            let cache = self.cache.read().await;
            if let Some(token) = cache.get(&Self::cache_key(scopes)) {
                if !token.is_expired() {
                    return Ok(token.clone());
                }
            }
        }

        let refresh_token = self.refresh_token.read().await.clone();
        match refresh_token {
            Some(refresh_token) => {
                let token = self.fetch_refresh(&refresh_token, scopes).await?;
                self.store(scopes, token.clone()).await;
                Ok(token)
            }
            None => Err(Error::auth("No cached token for the requested scopes")),
        }
    }

    async fn acquire_interactive(&self, scopes: &[String]) -> Result<AcquiredToken> {
        let secret = self.config.client_secret.as_deref().ok_or_else(|| Error::OAuth2 {
            message: "Direct token acquisition requires a client secret".to_string(),
        })?;

        let token = self.fetch_client_credentials(secret, scopes).await?;
        info!(
            "Acquired app token for {} (expires {:?})",
            self.config.client_id, token.expires_at
        );
        self.store(scopes, token.clone()).await;

        Ok(AcquiredToken {
            account: self.account(),
            token,
        })
    }

    async fn begin_redirect(&self, scopes: &[String]) -> Result<String> {
        let redirect_uri = self
            .config
            .redirect_uri
            .as_deref()
            .ok_or_else(|| Error::missing_field("redirect_uri"))?;

        let mut url = url::Url::parse(&self.config.authorize_url())?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", &scopes.join(" "));

        Ok(url.to_string())
    }
}

impl std::fmt::Debug for OAuth2TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2TokenSource")
            .field("tenant_id", &self.config.tenant_id)
            .field("client_id", &self.config.client_id)
            .finish_non_exhaustive()
    }
}

/// OAuth2 token response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl TokenResponse {
    fn into_cached_token(self) -> CachedToken {
        match self.expires_in {
            Some(secs) => CachedToken::expires_in(self.access_token, secs),
            None => CachedToken::new(self.access_token, None),
        }
    }
}
