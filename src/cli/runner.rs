//! CLI runner - executes commands

use crate::cli::commands::{
    Cli, Commands, ConfigAction, MappingAction, OutputFormat, SourceAction,
};
use crate::config::ClientConfig;
use crate::error::{Error, Result, ResultExt};
use crate::query::{DataverseClient, KnowledgeSource};
use crate::resolver::EntitySetCache;
use serde_json::{json, Value};
use std::io::Write;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let config = self.load_config()?;

        if let Commands::Mappings { action } = &self.cli.command {
            return self.mappings(&config, action).await;
        }

        let client = DataverseClient::connect(&config).await?;
        match &self.cli.command {
            Commands::Sets => self.sets(&client).await,
            Commands::Metadata { set } => self.metadata(&client, set).await,
            Commands::Resolve { logical } => self.resolve(&client, logical).await,
            Commands::Records { name, limit } => self.records(&client, name, *limit).await,
            Commands::Articles { subject, limit } => {
                self.articles(&client, subject, *limit).await
            }
            Commands::Lookups { entity } => self.lookups(&client, entity).await,
            Commands::Fields { entity } => self.fields(&client, entity).await,
            Commands::Create { entity, data } => self.create(&client, entity, data).await,
            Commands::Update { entity, id, data } => {
                self.update(&client, entity, id, data).await
            }
            Commands::Delete { entity, id } => self.delete(&client, entity, id).await,
            Commands::Sources { action } => self.sources(&client, action).await,
            Commands::Config { action } => self.app_config(&client, action).await,
            Commands::Mappings { .. } => Ok(()),
        }
    }

    /// Load configuration from file or environment, applying overrides
    fn load_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.cli.config {
            Some(path) => ClientConfig::from_file(path)?,
            None => ClientConfig::from_env()?,
        };
        if let Some(token) = &self.cli.token {
            config.access_token = Some(token.clone());
        }
        Ok(config)
    }

    async fn sets(&self, client: &DataverseClient) -> Result<()> {
        let sets = client.list_entity_sets().await?;
        self.output_message(&json!({
            "type": "ENTITY_SETS",
            "count": sets.len(),
            "sets": sets
        }))?;
        Ok(())
    }

    async fn metadata(&self, client: &DataverseClient, set: &str) -> Result<()> {
        let metadata = client.get_metadata_for(set).await?;
        self.output_message(&json!({
            "type": "METADATA",
            "metadata": metadata
        }))?;
        Ok(())
    }

    async fn resolve(&self, client: &DataverseClient, logical: &str) -> Result<()> {
        let set = client.resolve_entity_set(logical).await?;
        self.output_message(&json!({
            "type": "RESOLVED",
            "logicalName": logical,
            "entitySet": set
        }))?;
        Ok(())
    }

    async fn records(&self, client: &DataverseClient, name: &str, limit: usize) -> Result<()> {
        let records = client.get_entity_records(name, limit).await;
        self.output_message(&json!({
            "type": "RECORDS",
            "name": name,
            "count": records.len(),
            "records": records
        }))?;
        Ok(())
    }

    async fn articles(&self, client: &DataverseClient, subject: &str, limit: usize) -> Result<()> {
        let articles = client
            .get_knowledge_articles_by_subject(subject, limit)
            .await?;
        self.output_message(&json!({
            "type": "ARTICLES",
            "subject": subject,
            "count": articles.len(),
            "records": articles
        }))?;
        Ok(())
    }

    async fn lookups(&self, client: &DataverseClient, entity: &str) -> Result<()> {
        let ranked = client.rank_lookup_attributes(entity).await;
        self.output_message(&json!({
            "type": "LOOKUPS",
            "entity": entity,
            "keyword": client.settings().subject_target.primary,
            "attributes": ranked
        }))?;
        Ok(())
    }

    async fn fields(&self, client: &DataverseClient, entity: &str) -> Result<()> {
        let fields = client.list_entity_fields(entity).await?;
        self.output_message(&json!({
            "type": "FIELDS",
            "entity": entity,
            "fields": fields
        }))?;
        Ok(())
    }

    async fn create(&self, client: &DataverseClient, entity: &str, data: &str) -> Result<()> {
        let payload = parse_payload(data)?;
        let id = client.create_entity_record(entity, &payload).await?;
        self.output_message(&json!({
            "type": "CREATED",
            "entity": entity,
            "id": id
        }))?;
        Ok(())
    }

    async fn update(
        &self,
        client: &DataverseClient,
        entity: &str,
        id: &str,
        data: &str,
    ) -> Result<()> {
        let payload = parse_payload(data)?;
        client.update_entity_record(entity, id, &payload).await?;
        self.output_message(&json!({
            "type": "UPDATED",
            "entity": entity,
            "id": id
        }))?;
        Ok(())
    }

    async fn delete(&self, client: &DataverseClient, entity: &str, id: &str) -> Result<()> {
        client.delete_entity_record(entity, id).await?;
        self.output_message(&json!({
            "type": "DELETED",
            "entity": entity,
            "id": id
        }))?;
        Ok(())
    }

    async fn sources(&self, client: &DataverseClient, action: &SourceAction) -> Result<()> {
        match action {
            SourceAction::List { limit } => {
                let sources = client.get_knowledge_sources(*limit).await;
                self.output_message(&json!({
                    "type": "KNOWLEDGE_SOURCES",
                    "count": sources.len(),
                    "sources": sources
                }))?;
            }
            SourceAction::Add {
                name,
                site_url,
                library,
                graph_endpoint,
            } => {
                let mut source = KnowledgeSource::new(name, site_url, library);
                if let Some(endpoint) = graph_endpoint {
                    source = source.with_graph_endpoint(endpoint);
                }
                let id = client.create_knowledge_source(&source).await?;
                self.output_message(&json!({
                    "type": "KNOWLEDGE_SOURCE_CREATED",
                    "name": name,
                    "id": id
                }))?;
            }
        }
        Ok(())
    }

    async fn app_config(&self, client: &DataverseClient, action: &ConfigAction) -> Result<()> {
        match action {
            ConfigAction::List => {
                let items = client.get_app_config_items().await?;
                self.output_message(&json!({
                    "type": "CONFIG_ITEMS",
                    "count": items.len(),
                    "items": items
                }))?;
            }
            ConfigAction::Get { key } => {
                let item = client
                    .find_app_config_item(key)
                    .await?
                    .ok_or_else(|| Error::Other(format!("No config entry named '{key}'")))?;
                self.output_message(&json!({
                    "type": "CONFIG_ITEM",
                    "item": item
                }))?;
            }
            ConfigAction::Set { key, value } => {
                client.upsert_app_config_item(key, value).await?;
                self.output_message(&json!({
                    "type": "CONFIG_SAVED",
                    "key": key
                }))?;
            }
            ConfigAction::Delete { key } => {
                let item = client
                    .find_app_config_item(key)
                    .await?
                    .ok_or_else(|| Error::Other(format!("No config entry named '{key}'")))?;
                let id = item
                    .id
                    .ok_or_else(|| Error::Other(format!("Config entry '{key}' has no id")))?;
                client.delete_app_config_item(&id).await?;
                self.output_message(&json!({
                    "type": "CONFIG_DELETED",
                    "key": key
                }))?;
            }
            ConfigAction::Ui => {
                let settings = client.ui_settings().await?;
                self.output_message(&json!({
                    "type": "UI_SETTINGS",
                    "settings": settings
                }))?;
            }
        }
        Ok(())
    }

    async fn mappings(&self, config: &ClientConfig, action: &MappingAction) -> Result<()> {
        let cache = EntitySetCache::load(config.mapping_store()).await?;
        match action {
            MappingAction::List => {
                let mappings: Vec<Value> = cache
                    .entries()
                    .await
                    .into_iter()
                    .map(|(requested, resolved)| json!({ "requested": requested, "resolved": resolved }))
                    .collect();
                self.output_message(&json!({
                    "type": "MAPPINGS",
                    "count": mappings.len(),
                    "mappings": mappings
                }))?;
            }
            MappingAction::Clear { name: Some(name) } => {
                let removed = cache.remove(name).await?;
                self.output_message(&json!({
                    "type": "MAPPING_CLEARED",
                    "name": name,
                    "removed": removed
                }))?;
            }
            MappingAction::Clear { name: None } => {
                let count = cache.len().await;
                cache.clear().await?;
                self.output_message(&json!({
                    "type": "MAPPINGS_CLEARED",
                    "removed": count
                }))?;
            }
        }
        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) -> Result<()> {
        let line = match self.cli.format {
            OutputFormat::Json => serde_json::to_string(msg)?,
            OutputFormat::Pretty => serde_json::to_string_pretty(msg)?,
        };
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{line}")?;
        Ok(())
    }
}

fn parse_payload(data: &str) -> Result<Value> {
    let payload: Value = serde_json::from_str(data).context("Invalid record JSON")?;
    if !payload.is_object() {
        return Err(Error::config("Record JSON must be an object"));
    }
    Ok(payload)
}
