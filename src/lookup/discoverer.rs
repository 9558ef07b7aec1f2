//! Lookup attribute discovery over the entity definitions endpoint

use super::ranking::{rank_attributes, AttributeInfo, LookupTarget};
use crate::error::Result;
use crate::http::ResourceFetcher;
use crate::types::odata_string;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Reads attribute definitions for an entity
#[derive(Debug, Clone)]
pub struct LookupDiscoverer {
    fetcher: Arc<ResourceFetcher>,
}

impl LookupDiscoverer {
    pub fn new(fetcher: Arc<ResourceFetcher>) -> Self {
        Self { fetcher }
    }

    /// Lookup attributes of `entity` ranked against `target`
    ///
    /// Best effort: any failure yields an empty list.
    pub async fn rank_lookup_attributes(&self, entity: &str, target: &LookupTarget) -> Vec<String> {
        let path = format!(
            "{}/Attributes/Microsoft.Dynamics.CRM.LookupAttributeMetadata?$select=LogicalName,AttributeType,Targets",
            definition_path(entity)
        );

        match self.attributes(&path).await {
            Ok(attributes) => {
                let ranked = rank_attributes(&attributes, target);
                debug!("Ranked lookup attributes for {}: {:?}", entity, ranked);
                ranked
            }
            Err(e) => {
                warn!("Lookup discovery for {} failed: {}", entity, e);
                Vec::new()
            }
        }
    }

    /// Every attribute of `entity` with its type
    pub async fn list_entity_fields(&self, entity: &str) -> Result<Vec<AttributeInfo>> {
        let path = format!(
            "{}/Attributes?$select=LogicalName,AttributeType",
            definition_path(entity)
        );
        self.attributes(&path).await
    }

    async fn attributes(&self, path: &str) -> Result<Vec<AttributeInfo>> {
        let body = self.fetcher.get_json(path).await?;
        let rows = match body.get("value") {
            Some(Value::Array(rows)) => rows.clone(),
            _ => Vec::new(),
        };

        Ok(rows
            .into_iter()
            .filter_map(|row| serde_json::from_value::<AttributeInfo>(row).ok())
            .filter(|a| !a.logical_name.is_empty())
            .collect())
    }
}

fn definition_path(entity: &str) -> String {
    format!(
        "EntityDefinitions(LogicalName={})",
        odata_string(&entity.to_lowercase())
    )
}
