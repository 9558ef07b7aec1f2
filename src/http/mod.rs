//! HTTP module
//!
//! Fetches Web API resources with bearer authentication.
//!
//! # Behaviour
//!
//! - **JSON first**: bodies are parsed as JSON, falling back to raw text
//! - **Casing fallback**: a 404 is retried once against the lower-cased path
//! - **Diagnostics**: failures carry status, status text, URL and body

mod client;

pub use client::{
    lowercase_path, FetchBody, FetchResponse, FetcherConfig, FetcherConfigBuilder, RequestConfig,
    ResourceFetcher, DEFAULT_API_VERSION,
};
