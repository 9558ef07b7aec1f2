//! Token provider
//!
//! Drives silent, interactive and redirect acquisition against a
//! [`TokenSource`] as an explicit state machine.

use super::oauth2::OAuth2TokenSource;
use super::types::{
    AcquiredToken, AcquisitionState, Account, AuthConfig, CachedToken, TokenResult,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Backend that knows how to obtain tokens for one identity provider
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Accounts with a cached session, in preference order
    fn accounts(&self) -> Vec<Account>;

    /// Obtain a token without user interaction
    async fn acquire_silent(&self, account: &Account, scopes: &[String]) -> Result<CachedToken>;

    /// Obtain a token by asking the identity provider directly
    async fn acquire_interactive(&self, scopes: &[String]) -> Result<AcquiredToken>;

    /// Start a full-page redirect and return the URL being navigated to
    async fn begin_redirect(&self, scopes: &[String]) -> Result<String>;
}

/// Hands out bearer tokens for the target API
pub struct TokenProvider {
    source: Arc<dyn TokenSource>,
    active_account: RwLock<Option<Account>>,
}

impl TokenProvider {
    /// Create a provider over the given source
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self {
            source,
            active_account: RwLock::new(None),
        }
    }

    /// Create a provider from an auth config
    pub fn from_config(config: AuthConfig) -> Self {
        let source: Arc<dyn TokenSource> = match config {
            AuthConfig::None => Arc::new(NoAccountSource),
            AuthConfig::Bearer { token } => Arc::new(StaticTokenSource::new(token)),
            AuthConfig::OAuth2(oauth) => Arc::new(OAuth2TokenSource::new(oauth)),
        };
        Self::new(source)
    }

    /// Currently selected account, if any
    pub async fn active_account(&self) -> Option<Account> {
        self.active_account.read().await.clone()
    }

    /// Select the account used for silent acquisition
    pub async fn set_active_account(&self, account: Option<Account>) {
        *self.active_account.write().await = account;
    }

    /// Acquire a token for `scopes`
    ///
    /// Silent against the active (or first cached) account, then
    /// interactive, then a redirect. The redirect leg never yields a token:
    /// it ends in [`TokenResult::InteractionRequired`].
    pub async fn acquire_token(&self, scopes: &[String]) -> TokenResult {
        let accounts = self.source.accounts();
        if accounts.is_empty() {
            return TokenResult::Failed(Error::NoAccount);
        }

        let account = match self.active_account().await {
            Some(active) if accounts.contains(&active) => active,
            _ => accounts[0].clone(),
        };

        let mut state = AcquisitionState::Silent;
        loop {
            let failure = match state {
                AcquisitionState::Silent => {
                    match self.source.acquire_silent(&account, scopes).await {
                        Ok(token) => {
                            debug!("Silent token acquisition succeeded for {}", account.id);
                            return TokenResult::Token(token.token);
                        }
                        Err(e) => e,
                    }
                }
                AcquisitionState::Interactive => {
                    match self.source.acquire_interactive(scopes).await {
                        Ok(acquired) => {
                            self.set_active_account(Some(acquired.account)).await;
                            return TokenResult::Token(acquired.token.token);
                        }
                        Err(e) => e,
                    }
                }
                AcquisitionState::RedirectPending => {
                    return match self.source.begin_redirect(scopes).await {
                        Ok(redirect_url) => TokenResult::InteractionRequired { redirect_url },
                        Err(e) => TokenResult::Failed(e),
                    };
                }
            };

            warn!("Token acquisition ({:?}) failed: {}", state, failure);
            match state.on_failure() {
                Some(next) => state = next,
                None => return TokenResult::Failed(failure),
            }
        }
    }

    /// Acquire a token, failing unless one is actually returned
    pub async fn access_token(&self, scopes: &[String]) -> Result<String> {
        self.acquire_token(scopes).await.into_result()
    }
}

impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenProvider").finish_non_exhaustive()
    }
}

/// Source with one fixed bearer token
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    /// Create a source that always returns `token`
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    fn accounts(&self) -> Vec<Account> {
        vec![Account::new("static")]
    }

    async fn acquire_silent(&self, _account: &Account, _scopes: &[String]) -> Result<CachedToken> {
        Ok(CachedToken::new(self.token.clone(), None))
    }

    async fn acquire_interactive(&self, _scopes: &[String]) -> Result<AcquiredToken> {
        Ok(AcquiredToken {
            account: Account::new("static"),
            token: CachedToken::new(self.token.clone(), None),
        })
    }

    async fn begin_redirect(&self, _scopes: &[String]) -> Result<String> {
        Err(Error::auth("A static token cannot start a sign-in redirect"))
    }
}

/// Source with no session at all
#[derive(Debug, Clone, Copy)]
struct NoAccountSource;

#[async_trait]
impl TokenSource for NoAccountSource {
    fn accounts(&self) -> Vec<Account> {
        Vec::new()
    }

    async fn acquire_silent(&self, _account: &Account, _scopes: &[String]) -> Result<CachedToken> {
        Err(Error::NoAccount)
    }

    async fn acquire_interactive(&self, _scopes: &[String]) -> Result<AcquiredToken> {
        Err(Error::NoAccount)
    }

    async fn begin_redirect(&self, _scopes: &[String]) -> Result<String> {
        Err(Error::NoAccount)
    }
}

/// Scope for the target API: its origin plus `/.default`
pub fn default_scope(api_url: &str) -> Result<String> {
    let url = url::Url::parse(api_url)?;
    Ok(format!("{}/.default", url.origin().ascii_serialization()))
}
