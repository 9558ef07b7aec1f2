//! Tests for the auth module

use super::*;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// State machine
// ============================================================================

#[derive(Default)]
struct FakeSource {
    accounts: Vec<Account>,
    silent_ok: bool,
    interactive_ok: bool,
    redirect_ok: bool,
    silent_calls: AtomicUsize,
    interactive_calls: AtomicUsize,
    redirect_calls: AtomicUsize,
}

impl FakeSource {
    fn signed_in() -> Self {
        Self {
            accounts: vec![Account::new("alice"), Account::new("bob")],
            ..Default::default()
        }
    }
}

#[async_trait]
impl TokenSource for FakeSource {
    fn accounts(&self) -> Vec<Account> {
        self.accounts.clone()
    }

    async fn acquire_silent(&self, account: &Account, _scopes: &[String]) -> Result<CachedToken> {
        self.silent_calls.fetch_add(1, Ordering::SeqCst);
        if self.silent_ok {
            Ok(CachedToken::new(format!("silent-{}", account.id), None))
        } else {
            Err(Error::auth("interaction required"))
        }
    }

    async fn acquire_interactive(&self, _scopes: &[String]) -> Result<AcquiredToken> {
        self.interactive_calls.fetch_add(1, Ordering::SeqCst);
        if self.interactive_ok {
            Ok(AcquiredToken {
                account: Account::new("bob"),
                token: CachedToken::new("interactive".to_string(), None),
            })
        } else {
            Err(Error::auth("popup blocked"))
        }
    }

    async fn begin_redirect(&self, _scopes: &[String]) -> Result<String> {
        self.redirect_calls.fetch_add(1, Ordering::SeqCst);
        if self.redirect_ok {
            Ok("https://login.example/authorize".to_string())
        } else {
            Err(Error::auth("redirect failed"))
        }
    }
}

fn scopes() -> Vec<String> {
    vec!["https://org.crm.dynamics.com/.default".to_string()]
}

#[tokio::test]
async fn test_no_accounts_fails_with_no_account() {
    let source = Arc::new(FakeSource::default());
    let provider = TokenProvider::new(source.clone());

    let result = provider.acquire_token(&scopes()).await;
    assert!(matches!(result, TokenResult::Failed(Error::NoAccount)));
    assert_eq!(source.silent_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_silent_uses_first_account() {
    let source = Arc::new(FakeSource {
        silent_ok: true,
        ..FakeSource::signed_in()
    });
    let provider = TokenProvider::new(source.clone());

    let token = provider.access_token(&scopes()).await.unwrap();
    assert_eq!(token, "silent-alice");
    assert_eq!(source.interactive_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_silent_prefers_active_account() {
    let source = Arc::new(FakeSource {
        silent_ok: true,
        ..FakeSource::signed_in()
    });
    let provider = TokenProvider::new(source);
    provider.set_active_account(Some(Account::new("bob"))).await;

    let token = provider.access_token(&scopes()).await.unwrap();
    assert_eq!(token, "silent-bob");
}

#[tokio::test]
async fn test_interactive_fallback_selects_account() {
    let source = Arc::new(FakeSource {
        interactive_ok: true,
        ..FakeSource::signed_in()
    });
    let provider = TokenProvider::new(source.clone());

    let token = provider.access_token(&scopes()).await.unwrap();
    assert_eq!(token, "interactive");
    assert_eq!(source.silent_calls.load(Ordering::SeqCst), 1);
    assert_eq!(source.interactive_calls.load(Ordering::SeqCst), 1);
    assert_eq!(provider.active_account().await, Some(Account::new("bob")));
}

#[tokio::test]
async fn test_redirect_is_terminal_and_returns_no_token() {
    let source = Arc::new(FakeSource {
        redirect_ok: true,
        ..FakeSource::signed_in()
    });
    let provider = TokenProvider::new(source.clone());

    let result = provider.acquire_token(&scopes()).await;
    match result {
        TokenResult::InteractionRequired { redirect_url } => {
            assert_eq!(redirect_url, "https://login.example/authorize");
        }
        other => panic!("expected InteractionRequired, got {other:?}"),
    }
    assert_eq!(source.redirect_calls.load(Ordering::SeqCst), 1);

    let err = provider.access_token(&scopes()).await.unwrap_err();
    assert!(matches!(err, Error::InteractionRequired { .. }));
}

#[tokio::test]
async fn test_all_legs_failing_is_failed() {
    let source = Arc::new(FakeSource::signed_in());
    let provider = TokenProvider::new(source);

    let result = provider.acquire_token(&scopes()).await;
    assert!(matches!(result, TokenResult::Failed(Error::Auth { .. })));
}

#[tokio::test]
async fn test_static_token_source() {
    let provider = TokenProvider::from_config(AuthConfig::Bearer {
        token: "abc".to_string(),
    });
    assert_eq!(provider.access_token(&scopes()).await.unwrap(), "abc");
}

#[tokio::test]
async fn test_auth_config_none_has_no_account() {
    let provider = TokenProvider::from_config(AuthConfig::None);
    let err = provider.access_token(&scopes()).await.unwrap_err();
    assert!(matches!(err, Error::NoAccount));
}

#[test]
fn test_default_scope() {
    assert_eq!(
        default_scope("https://org.crm.dynamics.com/api/data/v9.2").unwrap(),
        "https://org.crm.dynamics.com/.default"
    );
    assert!(default_scope("not a url").is_err());
}

// ============================================================================
// OAuth2 source
// ============================================================================

fn oauth_config(server: &MockServer) -> OAuth2Config {
    OAuth2Config {
        authority: Some(server.uri()),
        tenant_id: "tenant".to_string(),
        client_id: "client".to_string(),
        client_secret: Some("secret".to_string()),
        refresh_token: None,
        redirect_uri: Some("http://localhost:5173".to_string()),
    }
}

#[tokio::test]
async fn test_oauth2_client_credentials_then_cached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tenant/oauth2/v2.0/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=client"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "app-token",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = TokenProvider::new(Arc::new(OAuth2TokenSource::new(oauth_config(
        &mock_server,
    ))));

    // First call: silent misses, client credentials fills the cache
    assert_eq!(provider.access_token(&scopes()).await.unwrap(), "app-token");
    // Second call: served silently from the cache
    assert_eq!(provider.access_token(&scopes()).await.unwrap(), "app-token");
}

#[tokio::test]
async fn test_oauth2_refresh_token_is_silent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tenant/oauth2/v2.0/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=rt-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "user-token",
            "refresh_token": "rt-2",
            "expires_in": 3600
        })))
        .mount(&mock_server)
        .await;

    let config = OAuth2Config {
        client_secret: None,
        refresh_token: Some("rt-1".to_string()),
        ..oauth_config(&mock_server)
    };
    let source = OAuth2TokenSource::new(config);
    let account = source.accounts().remove(0);

    let token = source.acquire_silent(&account, &scopes()).await.unwrap();
    assert_eq!(token.token, "user-token");
}

#[tokio::test]
async fn test_oauth2_failure_falls_through_to_redirect() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tenant/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
        .mount(&mock_server)
        .await;

    let provider = TokenProvider::new(Arc::new(OAuth2TokenSource::new(oauth_config(
        &mock_server,
    ))));

    match provider.acquire_token(&scopes()).await {
        TokenResult::InteractionRequired { redirect_url } => {
            assert!(redirect_url.starts_with(&format!(
                "{}/tenant/oauth2/v2.0/authorize?",
                mock_server.uri()
            )));
            assert!(redirect_url.contains("client_id=client"));
            assert!(redirect_url.contains("response_type=code"));
        }
        other => panic!("expected InteractionRequired, got {other:?}"),
    }
}

#[test]
fn test_oauth2_without_credentials_has_no_accounts() {
    let source = OAuth2TokenSource::new(OAuth2Config {
        tenant_id: "t".to_string(),
        client_id: "c".to_string(),
        ..Default::default()
    });
    assert!(source.accounts().is_empty());
}
