//! App configuration entries and form mappings
//!
//! Configuration rows live in a custom entity whose column names vary
//! between environments. Rows are normalized to key/value pairs using the
//! entity's inferred metadata first and fixed candidate names second.

use super::client::DataverseClient;
use crate::error::Result;
use crate::metadata::EntityMetadata;
use crate::types::{JsonObject, JsonValue, Record};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

/// Key of the entry holding UI settings
pub const UI_SETTINGS_KEY: &str = "ui:settings";

const ID_CANDIDATES: &[&str] = &["@odata.id", "id", "configid", "appconfigid"];
const KEY_CANDIDATES: &[&str] = &["name", "key", "configkey", "ms_name", "app_name"];
const VALUE_CANDIDATES: &[&str] = &["value", "configvalue", "ms_value", "description"];

/// One normalized configuration entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppConfigItem {
    /// Record id or `@odata.id`, when one could be found
    pub id: Option<String>,
    pub key: String,
    pub value: String,
    /// The row as returned by the API
    pub raw: Record,
}

impl AppConfigItem {
    /// Normalize a raw row
    pub fn from_record(record: Record, metadata: Option<&EntityMetadata>) -> Self {
        let id = metadata
            .and_then(|m| text_field(&record, &m.key_name))
            .or_else(|| first_text(&record, ID_CANDIDATES));
        let key = metadata
            .and_then(|m| m.display_name.as_deref())
            .and_then(|f| text_field(&record, f))
            .or_else(|| first_text(&record, KEY_CANDIDATES))
            .unwrap_or_default();
        let value = metadata
            .and_then(|m| m.value_name.as_deref())
            .and_then(|f| text_field(&record, f))
            .or_else(|| first_text(&record, VALUE_CANDIDATES))
            .unwrap_or_default();

        Self {
            id,
            key,
            value,
            raw: record,
        }
    }

    /// Parse the value as JSON
    pub fn json_value(&self) -> Result<JsonValue> {
        Ok(serde_json::from_str(&self.value)?)
    }
}

/// UI settings stored under [`UI_SETTINGS_KEY`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_sidebar: Option<bool>,
    /// Settings this crate does not interpret
    #[serde(flatten)]
    pub extra: JsonObject,
}

/// Input control for a mapped form field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    Text,
    Textarea,
    Date,
    Number,
    Choice,
}

/// One field of a mapped form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub input_type: InputType,
}

impl FormField {
    /// A text field labelled with its own name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: Some(name.clone()),
            name,
            required: false,
            input_type: InputType::Text,
        }
    }
}

/// Which fields of a table a named form shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormMapping {
    pub table: String,
    pub form_name: String,
    #[serde(default)]
    pub fields: Vec<FormField>,
}

impl FormMapping {
    /// Configuration key, `form:<table>:<form>`
    pub fn key(&self) -> String {
        form_key(&self.table, &self.form_name)
    }
}

/// Configuration key for a form mapping
pub fn form_key(table: &str, form_name: &str) -> String {
    format!("form:{table}:{form_name}")
}

impl DataverseClient {
    /// All configuration entries
    pub async fn get_app_config_items(&self) -> Result<Vec<AppConfigItem>> {
        let (set, metadata) = self.app_config_target().await?;
        let records = self.fetch_records(&set).await?;
        debug!("Read {} app config rows from {}", records.len(), set);

        Ok(records
            .into_iter()
            .map(|r| AppConfigItem::from_record(r, metadata.as_ref()))
            .collect())
    }

    /// The entry with `key`, compared case-insensitively
    pub async fn find_app_config_item(&self, key: &str) -> Result<Option<AppConfigItem>> {
        Ok(self
            .get_app_config_items()
            .await?
            .into_iter()
            .find(|item| item.key.eq_ignore_ascii_case(key)))
    }

    /// Create an entry, returning its id when reported
    pub async fn create_app_config_item(&self, key: &str, value: &str) -> Result<Option<String>> {
        let (set, metadata) = self.app_config_target().await?;
        let payload = config_payload(metadata.as_ref(), key, value);
        self.create_in_set(&set, &payload).await
    }

    /// Overwrite an entry's key and value
    pub async fn update_app_config_item(&self, id: &str, key: &str, value: &str) -> Result<()> {
        let (set, metadata) = self.app_config_target().await?;
        let payload = config_payload(metadata.as_ref(), key, value);
        self.update_in_set(&set, id, &payload).await
    }

    /// Delete an entry
    pub async fn delete_app_config_item(&self, id: &str) -> Result<()> {
        let (set, _) = self.app_config_target().await?;
        self.delete_in_set(&set, id).await
    }

    /// Create or update the entry with `key`
    pub async fn upsert_app_config_item(&self, key: &str, value: &str) -> Result<()> {
        match self.find_app_config_item(key).await? {
            Some(AppConfigItem { id: Some(id), .. }) => {
                self.update_app_config_item(&id, key, value).await
            }
            _ => self.create_app_config_item(key, value).await.map(|_| ()),
        }
    }

    /// UI settings; empty when the entry is missing or unparseable
    pub async fn ui_settings(&self) -> Result<UiSettings> {
        let Some(item) = self.find_app_config_item(UI_SETTINGS_KEY).await? else {
            return Ok(UiSettings::default());
        };
        match serde_json::from_str(&item.value) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                warn!("Ignoring unparseable {} entry: {}", UI_SETTINGS_KEY, e);
                Ok(UiSettings::default())
            }
        }
    }

    /// Store a form mapping under its key
    pub async fn save_form_mapping(&self, mapping: &FormMapping) -> Result<()> {
        let value = serde_json::to_string(mapping)?;
        self.upsert_app_config_item(&mapping.key(), &value).await
    }

    /// Read the form mapping stored under `key`
    pub async fn get_form_mapping(&self, key: &str) -> Result<Option<FormMapping>> {
        match self.find_app_config_item(key).await? {
            Some(item) => Ok(Some(serde_json::from_str(&item.value)?)),
            None => Ok(None),
        }
    }

    async fn app_config_target(&self) -> Result<(String, Option<EntityMetadata>)> {
        let set = self
            .resolver
            .resolve(&self.settings.app_config_entity)
            .await?;
        let metadata = match self.metadata.get_metadata_for(&set).await {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                warn!("No metadata for {}, using default column names: {}", set, e);
                None
            }
        };
        Ok((set, metadata))
    }
}

fn config_payload(metadata: Option<&EntityMetadata>, key: &str, value: &str) -> JsonValue {
    let key_field = metadata
        .and_then(|m| m.display_name.as_deref())
        .unwrap_or("name");
    let value_field = metadata
        .and_then(|m| m.value_name.as_deref())
        .filter(|field| !field.eq_ignore_ascii_case(key_field))
        .unwrap_or("value");

    let mut payload = JsonObject::new();
    payload.insert(key_field.to_string(), json!(key));
    payload.insert(value_field.to_string(), json!(value));
    JsonValue::Object(payload)
}

fn text_field(record: &Record, field: &str) -> Option<String> {
    match record.get(field)? {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn first_text(record: &Record, candidates: &[&str]) -> Option<String> {
    candidates.iter().find_map(|c| text_field(record, c))
}
