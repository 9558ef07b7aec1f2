//! Entity-set resolution
//!
//! Turns logical entity names into the entity-set names the API accepts in
//! URLs, remembering every answer in a persisted mapping.

mod cache;
pub mod matching;
#[allow(clippy::module_inception)]
mod resolver;
mod store;

pub use cache::EntitySetCache;
pub use matching::{match_name, NameMatcher, FALLBACK_CHAIN, RESOLVE_CHAIN};
pub use resolver::EntitySetResolver;
pub use store::{FileMappingStore, InMemoryMappingStore, MappingStore, DEFAULT_NAMESPACE};
