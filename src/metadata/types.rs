//! Metadata document types

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One entity set declared in the metadata document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    /// Callable path segment, e.g. `accounts`
    pub name: String,
    /// Entity type backing the set, namespace stripped
    pub underlying_type_name: String,
}

/// One structural property of an entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescriptor {
    /// Property name
    pub name: String,
    /// EDM type name, e.g. `Edm.String`
    pub type_name: String,
}

impl PropertyDescriptor {
    /// Whether this property holds a string
    pub fn is_string(&self) -> bool {
        self.type_name == "Edm.String"
    }
}

/// An entity type declared in the metadata document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDescriptor {
    /// Type name, namespace stripped
    pub type_name: String,
    /// Base type name, namespace stripped
    #[serde(default)]
    pub base_type: Option<String>,
    /// Declared structural properties, in document order
    #[serde(default)]
    pub properties: Vec<PropertyDescriptor>,
    /// Declared (or inherited) key property
    #[serde(default)]
    pub primary_key_property: Option<String>,
}

impl TypeDescriptor {
    /// Find a property by name, case-insensitively
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Whether the type has a property with this name
    pub fn has_property(&self, name: &str) -> bool {
        self.property(name).is_some()
    }
}

/// Summary used by the generic CRUD helpers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMetadata {
    /// Entity set the summary was computed for
    pub entity_set: String,
    /// Primary key property
    pub key_name: String,
    /// Best guess at a human-readable name property
    #[serde(default)]
    pub display_name: Option<String>,
    /// Best guess at a value/description property
    #[serde(default)]
    pub value_name: Option<String>,
}

/// Parsed metadata document
#[derive(Debug, Clone, Default)]
pub struct MetadataDocument {
    /// Entity sets, in document order
    pub resources: Vec<ResourceDescriptor>,
    /// Entity types by name
    pub types: HashMap<String, TypeDescriptor>,
}

impl MetadataDocument {
    /// Locate a resource: exact name, then case-insensitive, then suffix
    ///
    /// A blank name never matches.
    pub fn find_resource(&self, name: &str) -> Result<&ResourceDescriptor> {
        if name.trim().is_empty() {
            return Err(Error::resource_not_found(name));
        }
        let lowered = name.to_lowercase();

        self.resources
            .iter()
            .find(|r| r.name == name)
            .or_else(|| {
                self.resources
                    .iter()
                    .find(|r| r.name.eq_ignore_ascii_case(name))
            })
            .or_else(|| {
                self.resources
                    .iter()
                    .find(|r| r.name.to_lowercase().ends_with(&lowered))
            })
            .ok_or_else(|| Error::resource_not_found(name))
    }

    /// Type backing a resource
    pub fn type_for(&self, resource: &ResourceDescriptor) -> Result<&TypeDescriptor> {
        self.types
            .get(&resource.underlying_type_name)
            .ok_or_else(|| Error::resource_not_found(&resource.underlying_type_name))
    }

    /// Names of all entity sets
    pub fn resource_names(&self) -> Vec<String> {
        self.resources.iter().map(|r| r.name.clone()).collect()
    }
}
