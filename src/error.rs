//! Error types for the Knowledge Centre data layer
//!
//! This module defines the error hierarchy for the whole crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for the data layer
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("No signed-in account. Please sign in.")]
    NoAccount,

    #[error("Interactive sign-in required, navigate to {redirect_url}")]
    InteractionRequired { redirect_url: String },

    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("OAuth2 error: {message}")]
    OAuth2 { message: String },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request to {url} failed: {status} {status_text}: {body}")]
    RequestFailed {
        status: u16,
        status_text: String,
        url: String,
        body: String,
    },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Metadata / Resolution Errors
    // ============================================================================
    #[error("XML parsing error: {message}")]
    XmlParse { message: String },

    #[error("Resource '{name}' not found in metadata")]
    ResourceNotFound { name: String },

    #[error("Could not resolve entity set for '{name}'")]
    UnresolvableName { name: String },

    // ============================================================================
    // Store Errors
    // ============================================================================
    #[error("Mapping store error: {message}")]
    Store { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a request failure from the parts of a non-2xx response
    pub fn request_failed(
        status: u16,
        status_text: impl Into<String>,
        url: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self::RequestFailed {
            status,
            status_text: status_text.into(),
            url: url.into(),
            body: body.into(),
        }
    }

    /// Create a resource-not-found error
    pub fn resource_not_found(name: impl Into<String>) -> Self {
        Self::ResourceNotFound { name: name.into() }
    }

    /// Create an unresolvable-name error
    pub fn unresolvable(name: impl Into<String>) -> Self {
        Self::UnresolvableName { name: name.into() }
    }

    /// Create an XML parse error
    pub fn xml(message: impl Into<String>) -> Self {
        Self::XmlParse {
            message: message.into(),
        }
    }

    /// Create a store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::RequestFailed { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if this error means the addressed resource does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::ResourceNotFound { .. } | Error::UnresolvableName { .. } => true,
            _ => self.status() == Some(404),
        }
    }
}

/// Result type alias for the data layer
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::missing_field("api_url");
        assert_eq!(err.to_string(), "Missing required config field: api_url");

        let err = Error::request_failed(404, "Not Found", "https://org/api/data/v9.2/x", "{}");
        assert_eq!(
            err.to_string(),
            "Request to https://org/api/data/v9.2/x failed: 404 Not Found: {}"
        );

        assert_eq!(
            Error::NoAccount.to_string(),
            "No signed-in account. Please sign in."
        );
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::request_failed(404, "Not Found", "u", "").is_not_found());
        assert!(Error::resource_not_found("accounts").is_not_found());
        assert!(Error::unresolvable("account").is_not_found());

        assert!(!Error::request_failed(400, "Bad Request", "u", "").is_not_found());
        assert!(!Error::request_failed(500, "Server Error", "u", "").is_not_found());
        assert!(!Error::NoAccount.is_not_found());
        assert!(!Error::config("x").is_not_found());
    }

    #[test]
    fn test_status() {
        assert_eq!(Error::request_failed(403, "", "", "").status(), Some(403));
        assert_eq!(Error::store("x").status(), None);
    }

    #[test]
    fn test_io_errors_convert() {
        fn write_line(out: &mut impl std::io::Write) -> Result<()> {
            writeln!(out, "line")?;
            Ok(())
        }

        struct ClosedPipe;
        impl std::io::Write for ClosedPipe {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::ErrorKind::BrokenPipe.into())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let err = write_line(&mut ClosedPipe).unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::BrokenPipe));
        assert!(write_line(&mut Vec::new()).is_ok());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
