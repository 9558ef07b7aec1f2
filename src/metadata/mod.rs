//! Metadata module
//!
//! Parses the CSDL `$metadata` document and infers, per entity set, the
//! primary key plus best-guess display and value fields.
//!
//! # Overview
//!
//! - `parse_metadata` - CSDL to [`MetadataDocument`]
//! - `heuristics` - named strategy chains for key/display/value guesses
//! - `MetadataService` - fetch-once document, memoized [`EntityMetadata`]

pub mod heuristics;
mod parser;
mod service;
mod types;

pub use heuristics::{infer_entity_metadata, FieldStrategy};
pub use parser::{parse_metadata, strip_namespace};
pub use service::MetadataService;
pub use types::{
    EntityMetadata, MetadataDocument, PropertyDescriptor, ResourceDescriptor, TypeDescriptor,
};
