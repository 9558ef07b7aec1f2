//! Auth configuration and token types

use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default identity authority
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Authentication configuration
#[derive(Debug, Clone, Default)]
pub enum AuthConfig {
    /// No authentication available; every acquisition fails with `NoAccount`
    #[default]
    None,

    /// A fixed bearer token
    Bearer {
        /// The bearer token
        token: String,
    },

    /// OAuth2 against an Entra-style authority
    OAuth2(OAuth2Config),
}

/// OAuth2 settings for [`super::OAuth2TokenSource`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuth2Config {
    /// Authority base URL (defaults to the Microsoft login host)
    #[serde(default)]
    pub authority: Option<String>,
    /// Directory (tenant) id
    pub tenant_id: String,
    /// Application (client) id
    pub client_id: String,
    /// Client secret, enables the client-credentials grant
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Refresh token from an earlier delegated sign-in
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Redirect URI used when building the authorize URL
    #[serde(default)]
    pub redirect_uri: Option<String>,
}

impl OAuth2Config {
    fn authority_base(&self) -> String {
        let base = self.authority.as_deref().unwrap_or(DEFAULT_AUTHORITY);
        format!("{}/{}", base.trim_end_matches('/'), self.tenant_id)
    }

    /// Token endpoint for this tenant
    pub fn token_url(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.authority_base())
    }

    /// Authorize endpoint for this tenant
    pub fn authorize_url(&self) -> String {
        format!("{}/oauth2/v2.0/authorize", self.authority_base())
    }
}

/// A signed-in account (or the application itself for app-only flows)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Stable account identifier
    pub id: String,
    /// Login hint / user principal name, when known
    #[serde(default)]
    pub username: Option<String>,
}

impl Account {
    /// Create an account with only an id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: None,
        }
    }
}

/// Cached token with expiration
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// The access token
    pub token: String,
    /// When the token expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// Create a new cached token
    pub fn new(token: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { token, expires_at }
    }

    /// Create a token that expires in N seconds from now
    pub fn expires_in(token: String, seconds: i64) -> Self {
        let expires_at = Utc::now() + chrono::Duration::seconds(seconds);
        Self {
            token,
            expires_at: Some(expires_at),
        }
    }

    /// Check if the token is expired (with 30 second buffer)
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let buffer = chrono::Duration::seconds(30);
                Utc::now() + buffer >= expires_at
            }
            None => false,
        }
    }
}

/// Token obtained through an interactive leg, with the account it belongs to
#[derive(Debug, Clone)]
pub struct AcquiredToken {
    /// Account that now holds the session
    pub account: Account,
    /// The token itself
    pub token: CachedToken,
}

/// Stages of token acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionState {
    /// Use a cached session without user interaction
    Silent,
    /// Ask the identity provider directly (popup-equivalent)
    Interactive,
    /// A full-page navigation has been started; terminal
    RedirectPending,
}

impl AcquisitionState {
    /// State to move to after a failure in this state. `None` once terminal.
    pub fn on_failure(self) -> Option<Self> {
        match self {
            Self::Silent => Some(Self::Interactive),
            Self::Interactive => Some(Self::RedirectPending),
            Self::RedirectPending => None,
        }
    }
}

/// Outcome of [`super::TokenProvider::acquire_token`]
#[derive(Debug)]
pub enum TokenResult {
    /// A usable bearer token
    Token(String),
    /// Navigation to the identity provider has started; no token is coming back
    InteractionRequired {
        /// Where the user agent is being sent
        redirect_url: String,
    },
    /// Acquisition failed outright
    Failed(Error),
}

impl TokenResult {
    /// Convert into a plain result, treating a pending redirect as an error
    pub fn into_result(self) -> crate::error::Result<String> {
        match self {
            Self::Token(token) => Ok(token),
            Self::InteractionRequired { redirect_url } => {
                Err(Error::InteractionRequired { redirect_url })
            }
            Self::Failed(err) => Err(err),
        }
    }

    /// Whether a token was obtained
    pub fn is_token(&self) -> bool {
        matches!(self, Self::Token(_))
    }
}

#[cfg(test)]
mod type_tests {
    use super::*;

    #[test]
    fn test_cached_token_not_expired() {
        let token = CachedToken::expires_in("test".to_string(), 3600);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_cached_token_expired() {
        let token = CachedToken::expires_in("test".to_string(), -100);
        assert!(token.is_expired());
    }

    #[test]
    fn test_cached_token_inside_buffer_counts_as_expired() {
        let token = CachedToken::expires_in("test".to_string(), 10);
        assert!(token.is_expired());
    }

    #[test]
    fn test_cached_token_no_expiration() {
        let token = CachedToken::new("test".to_string(), None);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_acquisition_state_transitions() {
        assert_eq!(
            AcquisitionState::Silent.on_failure(),
            Some(AcquisitionState::Interactive)
        );
        assert_eq!(
            AcquisitionState::Interactive.on_failure(),
            Some(AcquisitionState::RedirectPending)
        );
        assert_eq!(AcquisitionState::RedirectPending.on_failure(), None);
    }

    #[test]
    fn test_oauth2_endpoints() {
        let config = OAuth2Config {
            tenant_id: "contoso".to_string(),
            client_id: "app".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.token_url(),
            "https://login.microsoftonline.com/contoso/oauth2/v2.0/token"
        );

        let config = OAuth2Config {
            authority: Some("http://127.0.0.1:9000/".to_string()),
            ..config
        };
        assert_eq!(
            config.authorize_url(),
            "http://127.0.0.1:9000/contoso/oauth2/v2.0/authorize"
        );
    }

    #[test]
    fn test_token_result_into_result() {
        assert_eq!(TokenResult::Token("t".into()).into_result().unwrap(), "t");

        let err = TokenResult::InteractionRequired {
            redirect_url: "https://login".into(),
        }
        .into_result()
        .unwrap_err();
        assert!(matches!(err, Error::InteractionRequired { .. }));

        let err = TokenResult::Failed(Error::NoAccount).into_result().unwrap_err();
        assert!(matches!(err, Error::NoAccount));
    }

    #[test]
    fn test_auth_config_default() {
        let config = AuthConfig::default();
        assert!(matches!(config, AuthConfig::None));
    }
}
