//! Entity-set resolver

use super::cache::EntitySetCache;
use super::matching::{match_name, RESOLVE_CHAIN};
use crate::error::{Error, Result};
use crate::http::ResourceFetcher;
use crate::metadata::MetadataService;
use crate::types::odata_string;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Maps logical entity names to the entity-set names used in URLs
#[derive(Debug, Clone)]
pub struct EntitySetResolver {
    fetcher: Arc<ResourceFetcher>,
    metadata: Arc<MetadataService>,
    cache: Arc<EntitySetCache>,
}

impl EntitySetResolver {
    /// Create a resolver sharing the given cache
    pub fn new(
        fetcher: Arc<ResourceFetcher>,
        metadata: Arc<MetadataService>,
        cache: Arc<EntitySetCache>,
    ) -> Self {
        Self {
            fetcher,
            metadata,
            cache,
        }
    }

    /// The mapping cache
    pub fn cache(&self) -> &Arc<EntitySetCache> {
        &self.cache
    }

    /// Resolve a logical name to its entity-set name
    ///
    /// Order: cache, entity-definition lookup, then matching against the
    /// listed entity sets. Any success is written back to the cache.
    pub async fn resolve(&self, logical_name: &str) -> Result<String> {
        if let Some(hit) = self.cache.get(logical_name).await {
            debug!("Entity set for {} from cache: {}", logical_name, hit);
            return Ok(hit);
        }

        match self.lookup_definition(logical_name).await {
            Ok(Some(set)) => {
                info!("Resolved {} to {} via entity definition", logical_name, set);
                self.remember(logical_name, &set).await;
                return Ok(set);
            }
            Ok(None) => debug!("Entity definition for {} has no set name", logical_name),
            Err(e) => debug!("Entity definition lookup for {} failed: {}", logical_name, e),
        }

        let sets = self.metadata.list_entity_sets().await.map_err(|e| {
            warn!("Could not list entity sets for {}: {}", logical_name, e);
            Error::unresolvable(logical_name)
        })?;

        match match_name(RESOLVE_CHAIN, logical_name, &sets) {
            Some((strategy, set)) => {
                info!("Resolved {} to {} ({} match)", logical_name, set, strategy);
                self.remember(logical_name, &set).await;
                Ok(set)
            }
            None => Err(Error::unresolvable(logical_name)),
        }
    }

    /// Record a mapping learned elsewhere
    pub async fn remember(&self, name: &str, resolved: &str) {
        if let Err(e) = self.cache.set(name, resolved).await {
            warn!("Failed to persist entity-set mapping {} -> {}: {}", name, resolved, e);
        }
    }

    async fn lookup_definition(&self, logical_name: &str) -> Result<Option<String>> {
        let path = format!(
            "EntityDefinitions(LogicalName={})?$select=EntitySetName",
            odata_string(&logical_name.to_lowercase())
        );
        let definition = self.fetcher.get_json(&path).await?;
        Ok(definition
            .get("EntitySetName")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(ToString::to_string))
    }
}
