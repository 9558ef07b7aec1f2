//! Generic query façade
//!
//! [`DataverseClient`] ties the fetcher, metadata service, resolver and
//! lookup discoverer together behind record-level operations.

mod app_config;
mod articles;
mod client;
mod knowledge_sources;

pub use app_config::{
    form_key, AppConfigItem, FormField, FormMapping, InputType, UiSettings, UI_SETTINGS_KEY,
};
pub use articles::subject_filters;
pub use client::{DataverseClient, QuerySettings, DEFAULT_RECORD_LIMIT};
pub use knowledge_sources::KnowledgeSource;
