//! Metadata service
//!
//! Fetches `$metadata` once per service and memoizes one
//! [`EntityMetadata`] per requested resource name for the service lifetime.
//! A failed document fetch is not cached; the next call tries again.

use super::heuristics::infer_entity_metadata;
use super::parser::parse_metadata;
use super::types::{EntityMetadata, MetadataDocument};
use crate::error::{Error, Result};
use crate::http::{FetchBody, RequestConfig, ResourceFetcher};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, warn};

/// Metadata lookups over one API root
pub struct MetadataService {
    fetcher: Arc<ResourceFetcher>,
    document: OnceCell<Arc<MetadataDocument>>,
    cache: RwLock<HashMap<String, EntityMetadata>>,
}

impl MetadataService {
    /// Create a service using the given fetcher
    pub fn new(fetcher: Arc<ResourceFetcher>) -> Self {
        Self {
            fetcher,
            document: OnceCell::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The parsed metadata document, fetched on first use
    pub async fn document(&self) -> Result<Arc<MetadataDocument>> {
        self.document
            .get_or_try_init(|| async {
                let request = RequestConfig::new().header("Accept", "application/xml");
                let xml = match self.fetcher.fetch("$metadata", request).await? {
                    FetchBody::Text(text) => text,
                    FetchBody::Json(_) => {
                        return Err(Error::xml("Expected an XML metadata document, got JSON"))
                    }
                };
                let doc = parse_metadata(&xml)?;
                debug!(
                    "Parsed metadata: {} entity sets, {} entity types",
                    doc.resources.len(),
                    doc.types.len()
                );
                Ok::<_, Error>(Arc::new(doc))
            })
            .await
            .cloned()
    }

    /// Metadata summary for a resource name
    ///
    /// Fails with `ResourceNotFound` when no entity set matches by exact,
    /// case-insensitive or suffix comparison.
    pub async fn get_metadata_for(&self, resource_name: &str) -> Result<EntityMetadata> {
        if let Some(cached) = self.cache.read().await.get(resource_name) {
            return Ok(cached.clone());
        }

        let doc = self.document().await?;
        let resource = doc.find_resource(resource_name)?;
        let ty = doc.type_for(resource)?;
        let metadata = infer_entity_metadata(&resource.name, ty);
        debug!("Metadata for {}: {:?}", resource_name, metadata);

        self.cache
            .write()
            .await
            .insert(resource_name.to_string(), metadata.clone());
        Ok(metadata)
    }

    /// Names of every entity set the API exposes
    ///
    /// Reads the service document; falls back to the metadata document when
    /// the service document cannot be read.
    pub async fn list_entity_sets(&self) -> Result<Vec<String>> {
        match self.fetcher.get_json("").await {
            Ok(service_doc) => {
                let names: Vec<String> = service_doc
                    .get("value")
                    .and_then(|v| v.as_array())
                    .map(|sets| {
                        sets.iter()
                            .filter_map(|s| s.get("name").or_else(|| s.get("url")))
                            .filter_map(|n| n.as_str())
                            .map(ToString::to_string)
                            .collect()
                    })
                    .unwrap_or_default();
                if !names.is_empty() {
                    return Ok(names);
                }
                debug!("Service document listed no entity sets, reading $metadata");
            }
            Err(e) => warn!("Service document unavailable ({}), reading $metadata", e),
        }

        Ok(self.document().await?.resource_names())
    }
}

impl std::fmt::Debug for MetadataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataService")
            .field("document_loaded", &self.document.initialized())
            .finish_non_exhaustive()
    }
}
