//! Field-name inference
//!
//! Each guess is a named strategy `&TypeDescriptor -> Option<String>`.
//! Chains are tried in order and the first hit wins.

use super::types::{EntityMetadata, TypeDescriptor};

/// A named field-inference strategy
#[derive(Clone, Copy)]
pub struct FieldStrategy {
    /// Name used in logs and tests
    pub name: &'static str,
    /// The strategy itself
    pub apply: fn(&TypeDescriptor) -> Option<String>,
}

impl std::fmt::Debug for FieldStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FieldStrategy").field(&self.name).finish()
    }
}

/// Display-name candidates, in preference order
pub const DISPLAY_CANDIDATES: &[&str] = &[
    "name",
    "title",
    "displayname",
    "fullname",
    "subject",
    "key",
    "configkey",
];

/// Value candidates, in preference order
pub const VALUE_CANDIDATES: &[&str] = &[
    "value",
    "configvalue",
    "description",
    "content",
    "text",
    "notes",
];

/// Generic config-style key names
pub const CONFIG_KEY_CANDIDATES: &[&str] = &["configid", "appconfigid", "settingid"];

/// Key inference chain
pub const KEY_STRATEGIES: &[FieldStrategy] = &[
    FieldStrategy {
        name: "declared_key",
        apply: declared_key,
    },
    FieldStrategy {
        name: "id",
        apply: plain_id,
    },
    FieldStrategy {
        name: "type_id",
        apply: type_id,
    },
    FieldStrategy {
        name: "config_style_id",
        apply: config_style_id,
    },
];

/// Display-name inference chain
pub const DISPLAY_STRATEGIES: &[FieldStrategy] = &[
    FieldStrategy {
        name: "display_candidates",
        apply: display_candidate,
    },
    FieldStrategy {
        name: "prefixed_name",
        apply: prefixed_name,
    },
    FieldStrategy {
        name: "first_string",
        apply: first_string_not_key,
    },
];

/// Value inference chain
pub const VALUE_STRATEGIES: &[FieldStrategy] = &[
    FieldStrategy {
        name: "value_candidates",
        apply: value_candidate,
    },
    FieldStrategy {
        name: "prefixed_value",
        apply: prefixed_value,
    },
    FieldStrategy {
        name: "first_unused_string",
        apply: first_string_not_key_or_display,
    },
];

/// Run a chain, returning the first strategy that produced a field
pub fn first_match(
    strategies: &[FieldStrategy],
    ty: &TypeDescriptor,
) -> Option<(&'static str, String)> {
    strategies
        .iter()
        .find_map(|s| (s.apply)(ty).map(|field| (s.name, field)))
}

/// Like [`first_match`], skipping any strategy whose field is `excluded`
pub fn first_match_excluding(
    strategies: &[FieldStrategy],
    ty: &TypeDescriptor,
    excluded: Option<&str>,
) -> Option<(&'static str, String)> {
    strategies.iter().find_map(|s| {
        (s.apply)(ty)
            .filter(|field| excluded.map_or(true, |e| !field.eq_ignore_ascii_case(e)))
            .map(|field| (s.name, field))
    })
}

/// Summarize a type into [`EntityMetadata`]
///
/// When nothing matches, the key falls back to the `<type>id` naming
/// convention; display and value stay `None`. Display and value never name
/// the same field.
pub fn infer_entity_metadata(entity_set: &str, ty: &TypeDescriptor) -> EntityMetadata {
    let key_name = first_match(KEY_STRATEGIES, ty)
        .map_or_else(|| format!("{}id", ty.type_name), |(_, field)| field);
    let display_name = first_match(DISPLAY_STRATEGIES, ty).map(|(_, field)| field);
    let value_name = first_match_excluding(VALUE_STRATEGIES, ty, display_name.as_deref())
        .map(|(_, field)| field);

    EntityMetadata {
        entity_set: entity_set.to_string(),
        key_name,
        display_name,
        value_name,
    }
}

// ============================================================================
// Key strategies
// ============================================================================

fn declared_key(ty: &TypeDescriptor) -> Option<String> {
    ty.primary_key_property.clone()
}

fn plain_id(ty: &TypeDescriptor) -> Option<String> {
    property_named(ty, "id")
}

fn type_id(ty: &TypeDescriptor) -> Option<String> {
    property_named(ty, &format!("{}id", ty.type_name))
}

fn config_style_id(ty: &TypeDescriptor) -> Option<String> {
    CONFIG_KEY_CANDIDATES
        .iter()
        .find_map(|c| property_named(ty, c))
        .or_else(|| property_named(ty, &format!("{}_id", ty.type_name)))
}

/// The key as the key chain sees it, without the naming-convention fallback
fn inferred_key(ty: &TypeDescriptor) -> Option<String> {
    first_match(KEY_STRATEGIES, ty).map(|(_, field)| field)
}

// ============================================================================
// Display / value strategies
// ============================================================================

fn display_candidate(ty: &TypeDescriptor) -> Option<String> {
    DISPLAY_CANDIDATES.iter().find_map(|c| property_named(ty, c))
}

fn value_candidate(ty: &TypeDescriptor) -> Option<String> {
    VALUE_CANDIDATES.iter().find_map(|c| property_named(ty, c))
}

/// Publisher-prefixed name field, e.g. `e365_name`
fn prefixed_name(ty: &TypeDescriptor) -> Option<String> {
    prefixed(ty, &["name", "title"])
}

/// Publisher-prefixed value field, e.g. `e365_value`
fn prefixed_value(ty: &TypeDescriptor) -> Option<String> {
    prefixed(ty, &["value", "description"])
}

fn prefixed(ty: &TypeDescriptor, suffixes: &[&str]) -> Option<String> {
    suffixes.iter().find_map(|suffix| {
        let wanted = format!("_{suffix}");
        ty.properties
            .iter()
            .filter(|p| p.is_string() && !p.name.starts_with('_'))
            .find(|p| p.name.to_lowercase().ends_with(&wanted))
            .map(|p| p.name.clone())
    })
}

fn first_string_not_key(ty: &TypeDescriptor) -> Option<String> {
    let key = inferred_key(ty);
    ty.properties
        .iter()
        .filter(|p| p.is_string())
        .find(|p| {
            key.as_deref()
                .map_or(true, |k| !p.name.eq_ignore_ascii_case(k))
        })
        .map(|p| p.name.clone())
}

/// First string that is neither the key nor the inferred display field
fn first_string_not_key_or_display(ty: &TypeDescriptor) -> Option<String> {
    let key = inferred_key(ty);
    let display = first_match(DISPLAY_STRATEGIES, ty).map(|(_, field)| field);
    ty.properties
        .iter()
        .filter(|p| p.is_string())
        .map(|p| p.name.as_str())
        .find(|name| {
            [key.as_deref(), display.as_deref()]
                .iter()
                .flatten()
                .all(|taken| !name.eq_ignore_ascii_case(taken))
        })
        .map(ToString::to_string)
}

fn property_named(ty: &TypeDescriptor, name: &str) -> Option<String> {
    ty.property(name).map(|p| p.name.clone())
}
