//! Common types used throughout the data layer
//!
//! Shared type aliases and small helpers used across multiple modules.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// A record returned by the backend. The crate treats it as opaque data.
pub type Record = JsonObject;

// ============================================================================
// HTTP Types
// ============================================================================

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    GET,
    POST,
    PATCH,
    DELETE,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => reqwest::Method::GET,
            Method::POST => reqwest::Method::POST,
            Method::PATCH => reqwest::Method::PATCH,
            Method::DELETE => reqwest::Method::DELETE,
        }
    }
}

// ============================================================================
// Identifiers
// ============================================================================

static GUID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\{?([0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12})\}?$")
        .expect("valid GUID regex")
});

static EMBEDDED_GUID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(([0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12})\)")
        .expect("valid embedded GUID regex")
});

/// Return the bare GUID if `value` is a GUID, optionally wrapped in braces
pub fn as_guid(value: &str) -> Option<&str> {
    GUID_REGEX
        .captures(value.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Extract the GUID from a parenthesized segment such as `accounts(<guid>)`
pub fn guid_in_path(value: &str) -> Option<&str> {
    EMBEDDED_GUID_REGEX
        .captures(value)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Quote a string as an OData literal, doubling embedded single quotes
pub fn odata_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_guid() {
        let id = "5b0c3f5e-1d2a-4c3b-9a8e-7f6d5c4b3a21";
        assert_eq!(as_guid(id), Some(id));
        assert_eq!(as_guid(&format!("{{{id}}}")), Some(id));
        assert_eq!(as_guid("accounts"), None);
        assert_eq!(as_guid(&format!("accounts({id})")), None);
    }

    #[test]
    fn test_guid_in_path() {
        let id = "5b0c3f5e-1d2a-4c3b-9a8e-7f6d5c4b3a21";
        let url = format!("https://org.crm.dynamics.com/api/data/v9.2/accounts({id})");
        assert_eq!(guid_in_path(&url), Some(id));
        assert_eq!(guid_in_path("accounts"), None);
    }

    #[test]
    fn test_odata_string() {
        assert_eq!(odata_string("HR"), "'HR'");
        assert_eq!(odata_string("O'Brien"), "'O''Brien'");
    }

    #[test]
    fn test_method_conversion() {
        assert_eq!(reqwest::Method::from(Method::PATCH), reqwest::Method::PATCH);
        assert_eq!(Method::default(), Method::GET);
    }
}
