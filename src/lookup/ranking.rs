//! Lookup attribute scoring

use serde::{Deserialize, Deserializer, Serialize};

/// Score for an attribute whose own name contains the primary keyword
pub const NAME_SCORE: u32 = 10;
/// Score for an attribute with a relationship target containing the primary keyword
pub const TARGET_SCORE: u32 = 8;
/// Score for an attribute whose name contains the secondary keyword
pub const SECONDARY_SCORE: u32 = 4;

/// Attribute types that carry a relationship
const RELATIONSHIP_TYPES: &[&str] = &["Lookup", "Customer", "Owner"];

/// One attribute definition as returned by the API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeInfo {
    pub logical_name: String,
    #[serde(default)]
    pub attribute_type: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub targets: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl AttributeInfo {
    /// Create an attribute of the given type
    pub fn new(logical_name: impl Into<String>, attribute_type: Option<&str>) -> Self {
        Self {
            logical_name: logical_name.into(),
            attribute_type: attribute_type.map(ToString::to_string),
            targets: Vec::new(),
        }
    }

    /// Add relationship targets
    pub fn with_targets(mut self, targets: &[&str]) -> Self {
        self.targets = targets.iter().map(ToString::to_string).collect();
        self
    }

    /// Untyped rows come from the lookup-typed cast and count as relationships
    pub fn is_relationship(&self) -> bool {
        match &self.attribute_type {
            Some(t) => RELATIONSHIP_TYPES.iter().any(|r| r.eq_ignore_ascii_case(t)),
            None => true,
        }
    }
}

/// Keywords a lookup attribute is ranked against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTarget {
    pub primary: String,
    pub secondary: Option<String>,
}

impl LookupTarget {
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into().to_lowercase(),
            secondary: None,
        }
    }

    pub fn with_secondary(mut self, secondary: impl Into<String>) -> Self {
        self.secondary = Some(secondary.into().to_lowercase());
        self
    }
}

impl Default for LookupTarget {
    fn default() -> Self {
        Self::new("subject").with_secondary("topic")
    }
}

/// Score one attribute against the target keywords
pub fn score_lookup(attribute: &AttributeInfo, target: &LookupTarget) -> u32 {
    let name = attribute.logical_name.to_lowercase();
    let mut score = 0;

    if !target.primary.is_empty() {
        if name.contains(&target.primary) {
            score += NAME_SCORE;
        }
        if attribute
            .targets
            .iter()
            .any(|t| t.to_lowercase().contains(&target.primary))
        {
            score += TARGET_SCORE;
        }
    }

    if let Some(secondary) = target.secondary.as_deref().filter(|s| !s.is_empty()) {
        if name.contains(secondary) {
            score += SECONDARY_SCORE;
        }
    }

    score
}

/// Relationship attribute names by descending score
///
/// Equal scores keep declaration order.
pub fn rank_attributes(attributes: &[AttributeInfo], target: &LookupTarget) -> Vec<String> {
    let mut scored: Vec<(u32, &AttributeInfo)> = attributes
        .iter()
        .filter(|a| a.is_relationship())
        .map(|a| (score_lookup(a, target), a))
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored
        .into_iter()
        .map(|(_, a)| a.logical_name.clone())
        .collect()
}
