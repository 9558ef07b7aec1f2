//! Lookup attribute discovery
//!
//! Finds which relationship attribute of an entity most likely points at a
//! given concept (by default "subject", with "topic" as a weaker hint).

mod discoverer;
mod ranking;

pub use discoverer::LookupDiscoverer;
pub use ranking::{
    rank_attributes, score_lookup, AttributeInfo, LookupTarget, NAME_SCORE, SECONDARY_SCORE,
    TARGET_SCORE,
};
