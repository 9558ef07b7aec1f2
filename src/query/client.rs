//! Dataverse client façade
//!
//! Record reads come in two flavours. `try_get_entity_records` returns a
//! `Result`; `get_entity_records` logs any failure and yields an empty list.
//! Writes always return a `Result`.

use crate::auth::TokenProvider;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::http::{RequestConfig, ResourceFetcher};
use crate::lookup::{AttributeInfo, LookupDiscoverer, LookupTarget};
use crate::metadata::{EntityMetadata, MetadataService};
use crate::resolver::{match_name, EntitySetCache, EntitySetResolver, FALLBACK_CHAIN};
use crate::types::{as_guid, guid_in_path, JsonValue, Method, Record};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Row limit used when the caller does not give one
pub const DEFAULT_RECORD_LIMIT: usize = 50;

/// Entity names and keywords the domain helpers work with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySettings {
    /// Logical name of the app configuration entity
    pub app_config_entity: String,
    /// Logical name of the knowledge article entity
    pub article_entity: String,
    /// Entity (or entity set) holding knowledge sources
    pub knowledge_source_entity: String,
    /// Keywords for ranking the article's subject lookups
    pub subject_target: LookupTarget,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            app_config_entity: "e365_appconfig".to_string(),
            article_entity: "e365_knowledgearticle".to_string(),
            knowledge_source_entity: "KnowledgeSources".to_string(),
            subject_target: LookupTarget::default(),
        }
    }
}

/// High-level client over the Dataverse Web API
#[derive(Debug, Clone)]
pub struct DataverseClient {
    pub(crate) fetcher: Arc<ResourceFetcher>,
    pub(crate) metadata: Arc<MetadataService>,
    pub(crate) resolver: EntitySetResolver,
    pub(crate) lookups: LookupDiscoverer,
    pub(crate) settings: QuerySettings,
}

impl DataverseClient {
    /// Create a client over a fetcher and a mapping cache
    pub fn new(
        fetcher: Arc<ResourceFetcher>,
        cache: Arc<EntitySetCache>,
        settings: QuerySettings,
    ) -> Self {
        let metadata = Arc::new(MetadataService::new(fetcher.clone()));
        let resolver = EntitySetResolver::new(fetcher.clone(), metadata.clone(), cache);
        let lookups = LookupDiscoverer::new(fetcher.clone());

        Self {
            fetcher,
            metadata,
            resolver,
            lookups,
            settings,
        }
    }

    /// Build a client from configuration, loading the persisted mapping
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        Self::connect_with_tokens(config, Arc::new(TokenProvider::from_config(config.auth_config())))
            .await
    }

    /// Build a client from configuration with an explicit token provider
    pub async fn connect_with_tokens(
        config: &ClientConfig,
        tokens: Arc<TokenProvider>,
    ) -> Result<Self> {
        let fetcher = Arc::new(ResourceFetcher::new(config.fetcher_config()?, tokens)?);
        let cache = Arc::new(EntitySetCache::load(config.mapping_store()).await?);
        Ok(Self::new(fetcher, cache, config.query_settings()))
    }

    /// The underlying fetcher
    pub fn fetcher(&self) -> &Arc<ResourceFetcher> {
        &self.fetcher
    }

    /// The entity-set resolver
    pub fn resolver(&self) -> &EntitySetResolver {
        &self.resolver
    }

    /// Domain settings
    pub fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    // ========================================================================
    // Discovery
    // ========================================================================

    /// Every entity set the API exposes
    pub async fn list_entity_sets(&self) -> Result<Vec<String>> {
        self.metadata.list_entity_sets().await
    }

    /// Key/display/value summary for an entity set
    pub async fn get_metadata_for(&self, resource_name: &str) -> Result<EntityMetadata> {
        self.metadata.get_metadata_for(resource_name).await
    }

    /// Entity-set name for a logical name
    pub async fn resolve_entity_set(&self, logical_name: &str) -> Result<String> {
        self.resolver.resolve(logical_name).await
    }

    /// Attribute definitions of an entity
    pub async fn list_entity_fields(&self, entity: &str) -> Result<Vec<AttributeInfo>> {
        self.lookups.list_entity_fields(entity).await
    }

    /// Lookup attributes of `entity` ranked against the subject keywords
    pub async fn rank_lookup_attributes(&self, entity: &str) -> Vec<String> {
        self.lookups
            .rank_lookup_attributes(entity, &self.settings.subject_target)
            .await
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Up to `limit` records of the named entity set
    ///
    /// When the name is not found, the listed entity sets are matched
    /// (exact, plural/singular, all tokens, any token), the match is
    /// remembered, and the read is retried once.
    pub async fn try_get_entity_records(&self, name: &str, limit: usize) -> Result<Vec<Record>> {
        let set = self
            .resolver
            .cache()
            .get(name)
            .await
            .unwrap_or_else(|| name.to_string());

        let err = match self.fetch_records(&records_path(&set, limit)).await {
            Ok(records) => return Ok(records),
            Err(e) if e.is_not_found() => e,
            Err(e) => return Err(e),
        };
        debug!("{} not found ({}), matching against entity sets", set, err);

        let sets = self.metadata.list_entity_sets().await?;
        let matched = match match_name(FALLBACK_CHAIN, name, &sets) {
            Some((_, matched)) if matched == set => return Err(Error::unresolvable(name)),
            Some((strategy, matched)) => {
                info!("Using entity set {} for {} ({} match)", matched, name, strategy);
                matched
            }
            None => return Err(Error::unresolvable(name)),
        };

        self.resolver.remember(name, &matched).await;
        self.fetch_records(&records_path(&matched, limit)).await
    }

    /// Lenient form of [`Self::try_get_entity_records`]: failures give `[]`
    pub async fn get_entity_records(&self, name: &str, limit: usize) -> Vec<Record> {
        match self.try_get_entity_records(name, limit).await {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to read records for {}: {}", name, e);
                Vec::new()
            }
        }
    }

    /// Records of an entity set matching an OData filter expression
    pub async fn query_records(&self, set: &str, filter: &str, limit: usize) -> Result<Vec<Record>> {
        let encoded: String = url::form_urlencoded::byte_serialize(filter.as_bytes()).collect();
        self.fetch_records(&format!("{set}?$filter={encoded}&$top={limit}"))
            .await
    }

    pub(crate) async fn fetch_records(&self, path: &str) -> Result<Vec<Record>> {
        let body = self.fetcher.get_json(path).await?;
        Ok(match body {
            JsonValue::Object(mut map) => match map.remove("value") {
                Some(JsonValue::Array(rows)) => rows
                    .into_iter()
                    .filter_map(|row| match row {
                        JsonValue::Object(record) => Some(record),
                        _ => None,
                    })
                    .collect(),
                _ => Vec::new(),
            },
            _ => Vec::new(),
        })
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Create a record and return its id when the API reports one
    pub async fn create_entity_record(
        &self,
        entity: &str,
        payload: &JsonValue,
    ) -> Result<Option<String>> {
        let set = self.resolver.resolve(entity).await?;
        self.create_in_set(&set, payload).await
    }

    /// Patch a record
    pub async fn update_entity_record(
        &self,
        entity: &str,
        id: &str,
        payload: &JsonValue,
    ) -> Result<()> {
        let set = self.resolver.resolve(entity).await?;
        self.update_in_set(&set, id, payload).await
    }

    /// Delete a record
    pub async fn delete_entity_record(&self, entity: &str, id: &str) -> Result<()> {
        let set = self.resolver.resolve(entity).await?;
        self.delete_in_set(&set, id).await
    }

    pub(crate) async fn create_in_set(
        &self,
        set: &str,
        payload: &JsonValue,
    ) -> Result<Option<String>> {
        let request = RequestConfig::method(Method::POST).json(payload.clone());
        let response = self.fetcher.fetch_response(set, request).await?;
        info!("Created record in {}", set);

        Ok(response
            .entity_id
            .map(|url| guid_in_path(&url).map_or(url.clone(), ToString::to_string)))
    }

    pub(crate) async fn update_in_set(&self, set: &str, id: &str, payload: &JsonValue) -> Result<()> {
        let path = self.record_path(set, id);
        let request = RequestConfig::method(Method::PATCH).json(payload.clone());
        self.fetcher.fetch_response(&path, request).await?;
        info!("Updated {}", path);
        Ok(())
    }

    pub(crate) async fn delete_in_set(&self, set: &str, id: &str) -> Result<()> {
        let path = self.record_path(set, id);
        self.fetcher
            .fetch_response(&path, RequestConfig::method(Method::DELETE))
            .await?;
        info!("Deleted {}", path);
        Ok(())
    }

    /// Path addressing one record
    ///
    /// A GUID (braces allowed) becomes `set(<guid>)`. Anything else is taken
    /// as a pre-built path; absolute URLs are made relative to the API root.
    pub fn record_path(&self, set: &str, id: &str) -> String {
        let id = id.trim();
        if let Some(guid) = as_guid(id) {
            return format!("{set}({guid})");
        }
        if id.starts_with("http://") || id.starts_with("https://") {
            return self.fetcher.relative_path(id).to_string();
        }
        id.to_string()
    }
}

fn records_path(set: &str, limit: usize) -> String {
    format!("{set}?$top={limit}")
}
