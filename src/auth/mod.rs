//! Authentication module
//!
//! Supplies bearer tokens for the Dataverse Web API.
//!
//! The `TokenProvider` walks silent, interactive and redirect acquisition
//! over a pluggable `TokenSource`. A redirect never returns a token; it
//! surfaces as `TokenResult::InteractionRequired`.

mod authenticator;
mod oauth2;
mod types;

pub use authenticator::{default_scope, StaticTokenSource, TokenProvider, TokenSource};
pub use oauth2::OAuth2TokenSource;
pub use types::{
    AcquiredToken, AcquisitionState, Account, AuthConfig, CachedToken, OAuth2Config, TokenResult,
    DEFAULT_AUTHORITY,
};

#[cfg(test)]
mod tests;
