//! Client configuration
//!
//! Loaded from a YAML or JSON file, or from `KC_*` environment variables.
//! Everything the data layer needs to build a [`crate::DataverseClient`]
//! lives here.

use crate::auth::{default_scope, AuthConfig, OAuth2Config};
use crate::error::{Error, Result};
use crate::http::{FetcherConfig, DEFAULT_API_VERSION};
use crate::lookup::LookupTarget;
use crate::query::QuerySettings;
use crate::resolver::{FileMappingStore, InMemoryMappingStore, MappingStore, DEFAULT_NAMESPACE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Prefix for configuration environment variables
pub const ENV_PREFIX: &str = "KC_";

// ============================================================================
// Client Config
// ============================================================================

/// Complete client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Organization URL (e.g. `https://org.crm.dynamics.com`)
    pub api_url: String,

    /// Web API version
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Directory (tenant) id
    #[serde(default)]
    pub tenant_id: Option<String>,

    /// Application (client) id
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret for the client-credentials grant
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Refresh token from a delegated sign-in
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Redirect URI for interactive sign-in
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// Authority base URL
    #[serde(default)]
    pub authority: Option<String>,

    /// Fixed bearer token. Takes precedence over OAuth2 settings.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Token scopes. Defaults to `<api origin>/.default`.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Logical name of the app configuration entity
    #[serde(default = "default_app_config_entity")]
    pub app_config_entity: String,

    /// Logical name of the knowledge article entity
    #[serde(default = "default_article_entity")]
    pub article_entity: String,

    /// Entity (or entity set) holding knowledge sources
    #[serde(default = "default_knowledge_source_entity")]
    pub knowledge_source_entity: String,

    /// Keyword used to rank subject lookup attributes
    #[serde(default = "default_subject_keyword")]
    pub subject_keyword: String,

    /// Weaker keyword for subject lookup ranking
    #[serde(default = "default_secondary_keyword")]
    pub secondary_keyword: Option<String>,

    /// File holding the persisted entity-set mapping. In memory when unset.
    #[serde(default)]
    pub mapping_store: Option<PathBuf>,

    /// Key the mapping is stored under
    #[serde(default = "default_mapping_namespace")]
    pub mapping_namespace: String,

    /// Request timeout in seconds. Unset means the transport default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_app_config_entity() -> String {
    "e365_appconfig".to_string()
}

fn default_article_entity() -> String {
    "e365_knowledgearticle".to_string()
}

fn default_knowledge_source_entity() -> String {
    "KnowledgeSources".to_string()
}

fn default_subject_keyword() -> String {
    "subject".to_string()
}

fn default_secondary_keyword() -> Option<String> {
    Some("topic".to_string())
}

fn default_mapping_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

impl ClientConfig {
    /// Create a config for `api_url` with every other field defaulted
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_version: default_api_version(),
            tenant_id: None,
            client_id: None,
            client_secret: None,
            refresh_token: None,
            redirect_uri: None,
            authority: None,
            access_token: None,
            scopes: Vec::new(),
            app_config_entity: default_app_config_entity(),
            article_entity: default_article_entity(),
            knowledge_source_entity: default_knowledge_source_entity(),
            subject_keyword: default_subject_keyword(),
            secondary_keyword: default_secondary_keyword(),
            mapping_store: None,
            mapping_namespace: default_mapping_namespace(),
            timeout_secs: None,
        }
    }

    /// Load from a YAML or JSON file, picked by extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Parse YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read `KC_*` variables from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(format!("{ENV_PREFIX}{key}")).ok())
    }

    /// Build from a variable lookup (keys without the prefix)
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = get("API_URL").ok_or_else(|| Error::missing_field("KC_API_URL"))?;
        let mut config = Self::new(api_url);

        if let Some(version) = get("API_VERSION") {
            config.api_version = version;
        }
        config.tenant_id = get("TENANT_ID");
        config.client_id = get("CLIENT_ID");
        config.client_secret = get("CLIENT_SECRET");
        config.refresh_token = get("REFRESH_TOKEN");
        config.redirect_uri = get("REDIRECT_URI");
        config.authority = get("AUTHORITY");
        config.access_token = get("ACCESS_TOKEN");
        if let Some(scopes) = get("SCOPES") {
            config.scopes = scopes
                .split([',', ' '])
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect();
        }
        if let Some(entity) = get("APP_CONFIG_ENTITY") {
            config.app_config_entity = entity;
        }
        if let Some(entity) = get("ARTICLE_ENTITY") {
            config.article_entity = entity;
        }
        if let Some(entity) = get("KNOWLEDGE_SOURCE_ENTITY") {
            config.knowledge_source_entity = entity;
        }
        if let Some(keyword) = get("SUBJECT_KEYWORD") {
            config.subject_keyword = keyword;
        }
        if let Some(keyword) = get("SECONDARY_KEYWORD") {
            config.secondary_keyword = Some(keyword).filter(|k| !k.is_empty());
        }
        config.mapping_store = get("MAPPING_STORE").map(PathBuf::from);
        if let Some(namespace) = get("MAPPING_NAMESPACE") {
            config.mapping_namespace = namespace;
        }
        if let Some(timeout) = get("TIMEOUT_SECS") {
            let secs = timeout
                .parse()
                .map_err(|_| Error::config(format!("Invalid KC_TIMEOUT_SECS: {timeout}")))?;
            config.timeout_secs = Some(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check required fields and URL shape
    pub fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            return Err(Error::missing_field("api_url"));
        }
        url::Url::parse(&self.api_url)
            .map_err(|e| Error::config(format!("Invalid api_url '{}': {}", self.api_url, e)))?;

        if self.client_id.is_some() != self.tenant_id.is_some() {
            return Err(Error::config(
                "tenant_id and client_id must be set together",
            ));
        }
        if self.mapping_namespace.is_empty() {
            return Err(Error::config("mapping_namespace cannot be empty"));
        }
        Ok(())
    }

    /// Authentication settings derived from this config
    pub fn auth_config(&self) -> AuthConfig {
        if let Some(token) = &self.access_token {
            return AuthConfig::Bearer {
                token: token.clone(),
            };
        }

        match (&self.tenant_id, &self.client_id) {
            (Some(tenant_id), Some(client_id)) => AuthConfig::OAuth2(OAuth2Config {
                authority: self.authority.clone(),
                tenant_id: tenant_id.clone(),
                client_id: client_id.clone(),
                client_secret: self.client_secret.clone(),
                refresh_token: self.refresh_token.clone(),
                redirect_uri: self.redirect_uri.clone(),
            }),
            _ => AuthConfig::None,
        }
    }

    /// Fetcher settings derived from this config
    pub fn fetcher_config(&self) -> Result<FetcherConfig> {
        let mut builder = FetcherConfig::builder()
            .api_url(&self.api_url)
            .api_version(&self.api_version);

        if self.scopes.is_empty() {
            builder = builder.scope(default_scope(&self.api_url)?);
        } else {
            for scope in &self.scopes {
                builder = builder.scope(scope);
            }
        }
        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(builder.build())
    }

    /// Mapping store derived from this config
    pub fn mapping_store(&self) -> Arc<dyn MappingStore> {
        match &self.mapping_store {
            Some(path) => Arc::new(FileMappingStore::with_namespace(
                path,
                &self.mapping_namespace,
            )),
            None => Arc::new(InMemoryMappingStore::new()),
        }
    }

    /// Query settings derived from this config
    pub fn query_settings(&self) -> QuerySettings {
        let mut subject_target = LookupTarget::new(&self.subject_keyword);
        if let Some(secondary) = &self.secondary_keyword {
            subject_target = subject_target.with_secondary(secondary);
        }

        QuerySettings {
            app_config_entity: self.app_config_entity.clone(),
            article_entity: self.article_entity.clone(),
            knowledge_source_entity: self.knowledge_source_entity.clone(),
            subject_target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_parse_minimal_yaml() {
        let config = ClientConfig::from_yaml_str("api_url: https://org.crm.dynamics.com\n").unwrap();

        assert_eq!(config.api_url, "https://org.crm.dynamics.com");
        assert_eq!(config.api_version, "v9.2");
        assert_eq!(config.app_config_entity, "e365_appconfig");
        assert_eq!(config.article_entity, "e365_knowledgearticle");
        assert_eq!(config.knowledge_source_entity, "KnowledgeSources");
        assert_eq!(config.mapping_namespace, "kc:entitySetMap");
        assert!(config.mapping_store.is_none());
        assert!(matches!(config.auth_config(), AuthConfig::None));
    }

    #[test]
    fn test_parse_full_yaml() {
        let yaml = r#"
api_url: "https://org.crm.dynamics.com"
api_version: "v9.1"
tenant_id: "tenant"
client_id: "client"
client_secret: "secret"
scopes: ["https://org.crm.dynamics.com/user_impersonation"]
subject_keyword: "Category"
secondary_keyword: null
mapping_store: "/tmp/kc/mappings.json"
timeout_secs: 30
"#;
        let config = ClientConfig::from_yaml_str(yaml).unwrap();

        match config.auth_config() {
            AuthConfig::OAuth2(oauth) => {
                assert_eq!(oauth.tenant_id, "tenant");
                assert_eq!(oauth.client_id, "client");
                assert_eq!(oauth.client_secret, Some("secret".to_string()));
            }
            other => panic!("Expected OAuth2 auth, got {other:?}"),
        }

        let fetcher = config.fetcher_config().unwrap();
        assert_eq!(
            fetcher.api_root(),
            "https://org.crm.dynamics.com/api/data/v9.1"
        );
        assert_eq!(
            fetcher.scopes,
            vec!["https://org.crm.dynamics.com/user_impersonation"]
        );
        assert_eq!(fetcher.timeout, Some(Duration::from_secs(30)));

        let settings = config.query_settings();
        assert_eq!(settings.subject_target, LookupTarget::new("category"));
    }

    #[test]
    fn test_parse_json_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("kc.json");
        std::fs::write(
            &path,
            r#"{"api_url": "https://org.crm.dynamics.com", "access_token": "abc"}"#,
        )
        .unwrap();

        let config = ClientConfig::from_file(&path).unwrap();
        assert!(matches!(config.auth_config(), AuthConfig::Bearer { token } if token == "abc"));
    }

    #[test]
    fn test_missing_file() {
        let err = ClientConfig::from_file("/nonexistent/kc.yaml").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_default_scope_from_api_url() {
        let config = ClientConfig::new("https://org.crm.dynamics.com/api/data/v9.2");
        assert_eq!(
            config.fetcher_config().unwrap().scopes,
            vec!["https://org.crm.dynamics.com/.default"]
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(matches!(
            ClientConfig::from_yaml_str("api_url: \"\"\n").unwrap_err(),
            Error::MissingConfigField { .. }
        ));
        assert!(matches!(
            ClientConfig::from_yaml_str("api_url: not a url\n").unwrap_err(),
            Error::Config { .. }
        ));
        assert!(matches!(
            ClientConfig::from_yaml_str("api_url: https://x.test\nclient_id: c\n").unwrap_err(),
            Error::Config { .. }
        ));
    }

    #[test]
    fn test_from_vars() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("API_URL", "https://org.crm.dynamics.com"),
            ("ACCESS_TOKEN", "tok"),
            ("SCOPES", "a/.default, b/.default"),
            ("MAPPING_STORE", "/tmp/map.json"),
            ("TIMEOUT_SECS", "5"),
        ]);
        let config = ClientConfig::from_vars(|k| vars.get(k).map(ToString::to_string)).unwrap();

        assert_eq!(config.scopes, vec!["a/.default", "b/.default"]);
        assert_eq!(config.mapping_store, Some(PathBuf::from("/tmp/map.json")));
        assert_eq!(config.timeout_secs, Some(5));
        assert!(matches!(config.auth_config(), AuthConfig::Bearer { .. }));
    }

    #[test]
    fn test_from_vars_requires_api_url() {
        let err = ClientConfig::from_vars(|_| None).unwrap_err();
        assert!(matches!(err, Error::MissingConfigField { field } if field == "KC_API_URL"));
    }

    #[test]
    fn test_from_vars_rejects_bad_timeout() {
        let err = ClientConfig::from_vars(|k| match k {
            "API_URL" => Some("https://x.test".to_string()),
            "TIMEOUT_SECS" => Some("soon".to_string()),
            _ => None,
        })
        .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
