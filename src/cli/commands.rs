//! CLI commands and argument parsing

use crate::query::DEFAULT_RECORD_LIMIT;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Knowledge Centre data layer CLI
#[derive(Parser, Debug)]
#[command(name = "knowledge-centre")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML or JSON). Falls back to KC_* environment variables.
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Bearer token, overriding any configured credentials
    #[arg(long, global = true, env = "KC_ACCESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List entity sets exposed by the API
    Sets,

    /// Show inferred key/display/value columns for an entity set
    Metadata {
        /// Entity set name
        set: String,
    },

    /// Resolve a logical name to its entity set
    Resolve {
        /// Logical entity name
        logical: String,
    },

    /// Read records of an entity set
    Records {
        /// Entity set or logical name
        name: String,

        /// Maximum records
        #[arg(long, default_value_t = DEFAULT_RECORD_LIMIT)]
        limit: usize,
    },

    /// Knowledge articles for a subject id or name
    Articles {
        /// Subject GUID or name
        subject: String,

        /// Maximum records
        #[arg(long, default_value_t = 200)]
        limit: usize,
    },

    /// Rank lookup attributes of an entity against the subject keywords
    Lookups {
        /// Logical entity name
        entity: String,
    },

    /// List attributes of an entity
    Fields {
        /// Logical entity name
        entity: String,
    },

    /// Create a record
    Create {
        /// Logical entity name
        entity: String,

        /// Record body as JSON
        #[arg(long)]
        data: String,
    },

    /// Update a record
    Update {
        /// Logical entity name
        entity: String,

        /// Record GUID or path
        id: String,

        /// Fields to patch as JSON
        #[arg(long)]
        data: String,
    },

    /// Delete a record
    Delete {
        /// Logical entity name
        entity: String,

        /// Record GUID or path
        id: String,
    },

    /// Manage knowledge sources
    Sources {
        #[command(subcommand)]
        action: SourceAction,
    },

    /// Manage app configuration entries
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Manage the persisted entity-set mapping
    Mappings {
        #[command(subcommand)]
        action: MappingAction,
    },
}

/// App configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// List all entries
    List,

    /// Show one entry
    Get {
        /// Entry key
        key: String,
    },

    /// Create or update an entry
    Set {
        /// Entry key
        key: String,

        /// Entry value
        value: String,
    },

    /// Delete an entry
    Delete {
        /// Entry key
        key: String,
    },

    /// Show parsed UI settings
    Ui,
}

/// Knowledge source actions
#[derive(Subcommand, Debug)]
pub enum SourceAction {
    /// List knowledge sources
    List {
        /// Maximum records
        #[arg(long, default_value_t = DEFAULT_RECORD_LIMIT)]
        limit: usize,
    },

    /// Add a knowledge source
    Add {
        /// Display name
        name: String,

        /// SharePoint site URL
        site_url: String,

        /// Document library name
        library: String,

        /// Graph endpoint override
        #[arg(long)]
        graph_endpoint: Option<String>,
    },
}

/// Mapping actions
#[derive(Subcommand, Debug)]
pub enum MappingAction {
    /// List remembered mappings
    List,

    /// Forget one mapping, or all of them
    Clear {
        /// Requested or logical name to forget
        name: Option<String>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
