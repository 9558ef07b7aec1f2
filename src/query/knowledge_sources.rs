//! Knowledge sources: SharePoint libraries the portal indexes

use super::client::DataverseClient;
use crate::error::Result;
use crate::types::{JsonValue, Record};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One configured knowledge source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KnowledgeSource {
    pub source_name: String,
    pub share_point_site_url: String,
    pub library_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_endpoint: Option<String>,
}

impl KnowledgeSource {
    pub fn new(
        source_name: impl Into<String>,
        share_point_site_url: impl Into<String>,
        library_name: impl Into<String>,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            share_point_site_url: share_point_site_url.into(),
            library_name: library_name.into(),
            graph_endpoint: None,
        }
    }

    #[must_use]
    pub fn with_graph_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.graph_endpoint = Some(endpoint.into());
        self
    }

    /// Read a row; `None` when a required column is missing
    pub fn from_record(record: Record) -> Option<Self> {
        serde_json::from_value(JsonValue::Object(record)).ok()
    }
}

impl DataverseClient {
    /// Up to `limit` knowledge sources. Failures and malformed rows are skipped.
    pub async fn get_knowledge_sources(&self, limit: usize) -> Vec<KnowledgeSource> {
        let records = self
            .get_entity_records(&self.settings.knowledge_source_entity, limit)
            .await;
        let total = records.len();

        let sources: Vec<KnowledgeSource> = records
            .into_iter()
            .filter_map(KnowledgeSource::from_record)
            .collect();
        if sources.len() < total {
            debug!(
                "Skipped {} knowledge source rows without the expected columns",
                total - sources.len()
            );
        }
        sources
    }

    /// Create a knowledge source, returning its id when reported
    pub async fn create_knowledge_source(
        &self,
        source: &KnowledgeSource,
    ) -> Result<Option<String>> {
        let payload = serde_json::to_value(source)?;
        self.create_entity_record(&self.settings.knowledge_source_entity, &payload)
            .await
    }
}
