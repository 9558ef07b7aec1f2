//! CLI module
//!
//! Command-line interface over [`crate::DataverseClient`].
//!
//! # Commands
//!
//! - `sets` - List entity sets
//! - `metadata` - Inferred columns of an entity set
//! - `resolve` - Logical name to entity set
//! - `records` - Read records (empty on failure)
//! - `articles` - Knowledge articles by subject
//! - `lookups` / `fields` - Attribute discovery
//! - `create` / `update` / `delete` - Record writes
//! - `sources` - Knowledge sources
//! - `config` - App configuration entries
//! - `mappings` - Persisted entity-set mapping

mod commands;
mod runner;

pub use commands::{Cli, Commands, ConfigAction, MappingAction, OutputFormat, SourceAction};
pub use runner::Runner;
