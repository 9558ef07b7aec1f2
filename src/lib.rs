// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Knowledge Centre data layer
//!
//! Schema-agnostic access to a Dataverse (OData v4) Web API: token
//! acquisition, a resource fetcher with a casing fallback, CSDL metadata
//! inference, persisted entity-set resolution, lookup ranking, and a record
//! query façade.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use knowledge_centre::{ClientConfig, DataverseClient, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ClientConfig::from_file("kc.yaml")?;
//!     let client = DataverseClient::connect(&config).await?;
//!
//!     // Reads degrade to an empty list
//!     let contacts = client.get_entity_records("contact", 10).await;
//!
//!     // Writes always report failure
//!     client
//!         .create_app_config_item("site:title", "Knowledge Centre")
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        DataverseClient                          │
//! │  records (lenient / Result)   writes   app config   articles    │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌───────────┬────────────┬─────┴──────────┬─────────────────────┐
//! │   Auth    │   HTTP     │   Metadata     │ Resolver / Lookup   │
//! ├───────────┼────────────┼────────────────┼─────────────────────┤
//! │ Silent    │ 404 casing │ CSDL parser    │ Mapping cache       │
//! │ Interact. │ retry      │ Key/display/   │ Match chains        │
//! │ Redirect  │ JSON/text  │ value guesses  │ Lookup ranking      │
//! └───────────┴────────────┴────────────────┴─────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the data layer
pub mod error;

/// Common types and type aliases
pub mod types;

/// Token acquisition
pub mod auth;

/// Resource fetcher
pub mod http;

/// CSDL metadata parsing and field inference
pub mod metadata;

/// Entity-set resolution and the persisted mapping
pub mod resolver;

/// Lookup attribute discovery
pub mod lookup;

/// Record query façade
pub mod query;

/// Client configuration
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use auth::{AuthConfig, TokenProvider, TokenResult};
pub use config::ClientConfig;
pub use http::ResourceFetcher;
pub use metadata::{EntityMetadata, MetadataService};
pub use query::{
    AppConfigItem, DataverseClient, FormMapping, KnowledgeSource, QuerySettings, UiSettings,
};
pub use resolver::{EntitySetResolver, FileMappingStore, InMemoryMappingStore, MappingStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
