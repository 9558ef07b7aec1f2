//! Resource fetcher for the Dataverse Web API
//!
//! Issues one request against the API root, parses the body as JSON when it
//! can, and retries once with a lower-cased path when the first attempt comes
//! back 404. There is no other retry.

use crate::auth::TokenProvider;
use crate::error::{Error, Result};
use crate::types::Method;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Default Web API version
pub const DEFAULT_API_VERSION: &str = "v9.2";

/// Configuration for the fetcher
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Organization URL, or a full `/api/data/<version>` root
    pub api_url: String,
    /// Web API version appended when `api_url` is an organization URL
    pub api_version: String,
    /// Request timeout. Unset means the transport default.
    pub timeout: Option<Duration>,
    /// Scopes requested for every bearer token
    pub scopes: Vec<String>,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        let mut default_headers = HashMap::new();
        default_headers.insert("Accept".to_string(), "application/json".to_string());
        default_headers.insert("OData-MaxVersion".to_string(), "4.0".to_string());
        default_headers.insert("OData-Version".to_string(), "4.0".to_string());

        Self {
            api_url: String::new(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: None,
            scopes: Vec::new(),
            default_headers,
            user_agent: format!("knowledge-centre/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl FetcherConfig {
    /// Create a new config builder
    pub fn builder() -> FetcherConfigBuilder {
        FetcherConfigBuilder::default()
    }

    /// Computed API root, without a trailing slash
    pub fn api_root(&self) -> String {
        let base = self.api_url.trim_end_matches('/');
        if base.contains("/api/data/") {
            base.to_string()
        } else {
            format!("{base}/api/data/{}", self.api_version)
        }
    }
}

/// Builder for fetcher config
#[derive(Default)]
pub struct FetcherConfigBuilder {
    config: FetcherConfig,
}

impl FetcherConfigBuilder {
    /// Set the organization or API root URL
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into();
        self
    }

    /// Set the Web API version
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.config.api_version = version.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Add a token scope
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.config.scopes.push(scope.into());
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> FetcherConfig {
        self.config
    }
}

/// Configuration for a single request
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// HTTP method
    pub method: Method,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Request body (JSON)
    pub body: Option<Value>,
}

impl RequestConfig {
    /// Create a new GET request config
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a request config with the given method
    pub fn method(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set JSON body
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Parsed response body
#[derive(Debug, Clone, PartialEq)]
pub enum FetchBody {
    /// Body parsed as JSON
    Json(Value),
    /// Body that is not JSON (including an empty body)
    Text(String),
}

impl FetchBody {
    /// Borrow the JSON value, if the body was JSON
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    /// Take the JSON value, if the body was JSON
    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }
}

/// Body plus the response headers callers care about
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Final status code
    pub status: u16,
    /// `OData-EntityId` header of a create/update, if present
    pub entity_id: Option<String>,
    /// Parsed body
    pub body: FetchBody,
}

/// Fetches resources relative to the API root
pub struct ResourceFetcher {
    client: Client,
    config: FetcherConfig,
    tokens: Arc<TokenProvider>,
}

impl ResourceFetcher {
    /// Create a fetcher with the given config and token provider
    pub fn new(config: FetcherConfig, tokens: Arc<TokenProvider>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(&config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(Error::Http)?;

        Ok(Self {
            client,
            config,
            tokens,
        })
    }

    /// Computed API root
    pub fn api_root(&self) -> String {
        self.config.api_root()
    }

    /// Get the fetcher configuration
    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Fetch a resource and return its parsed body
    pub async fn fetch(&self, path: &str, request: RequestConfig) -> Result<FetchBody> {
        self.fetch_response(path, request).await.map(|r| r.body)
    }

    /// GET a resource
    pub async fn get(&self, path: &str) -> Result<FetchBody> {
        self.fetch(path, RequestConfig::new()).await
    }

    /// GET a resource that must be JSON
    pub async fn get_json(&self, path: &str) -> Result<Value> {
        match self.get(path).await? {
            FetchBody::Json(value) => Ok(value),
            FetchBody::Text(text) => Ok(serde_json::from_str(&text)?),
        }
    }

    /// Fetch a resource, keeping status and entity id
    pub async fn fetch_response(&self, path: &str, request: RequestConfig) -> Result<FetchResponse> {
        let token = self.tokens.access_token(&self.config.scopes).await?;

        let url = self.build_url(path);
        let response = self.send(&url, &request, &token).await?;

        if response.status() == StatusCode::NOT_FOUND {
            let lowered = lowercase_path(path);
            if lowered != path {
                info!("{} returned 404, retrying as {}", path, lowered);
                let lowered_url = self.build_url(&lowered);
                let retry = self.send(&lowered_url, &request, &token).await?;
                return into_fetch_response(retry, &lowered_url).await;
            }
        }

        into_fetch_response(response, &url).await
    }

    async fn send(&self, url: &str, request: &RequestConfig, token: &str) -> Result<Response> {
        let method: reqwest::Method = request.method.into();
        let mut req = self.client.request(method.clone(), url).bearer_auth(token);

        for (key, value) in &self.config.default_headers {
            if request.headers.keys().any(|k| k.eq_ignore_ascii_case(key)) {
                continue;
            }
            req = req.header(key.as_str(), value.as_str());
        }
        for (key, value) in &request.headers {
            req = req.header(key.as_str(), value.as_str());
        }
        if let Some(ref body) = request.body {
            req = req.json(body);
        }

        debug!("{} {}", method, url);
        req.send().await.map_err(Error::Http)
    }

    /// Build full URL from a path relative to the API root
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let root = self.config.api_root();
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            format!("{root}/")
        } else {
            format!("{root}/{path}")
        }
    }

    /// Make an absolute URL under the API root relative to it
    pub fn relative_path<'a>(&self, url: &'a str) -> &'a str {
        let root = self.config.api_root();
        url.strip_prefix(root.as_str())
            .map_or(url, |rest| rest.trim_start_matches('/'))
    }
}

impl std::fmt::Debug for ResourceFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceFetcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Lower-case the resource path, leaving any query string untouched
pub fn lowercase_path(path: &str) -> String {
    match path.split_once('?') {
        Some((resource, query)) => format!("{}?{query}", resource.to_lowercase()),
        None => path.to_lowercase(),
    }
}

async fn into_fetch_response(response: Response, url: &str) -> Result<FetchResponse> {
    let status = response.status();

    if !status.is_success() {
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        let body = response.text().await.unwrap_or_default();
        return Err(Error::request_failed(status.as_u16(), status_text, url, body));
    }

    let entity_id = response
        .headers()
        .get("OData-EntityId")
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);

    let text = response.text().await.map_err(Error::Http)?;
    let body = match serde_json::from_str(&text) {
        Ok(value) => FetchBody::Json(value),
        Err(_) => FetchBody::Text(text),
    };

    Ok(FetchResponse {
        status: status.as_u16(),
        entity_id,
        body,
    })
}
