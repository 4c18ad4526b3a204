//! Identity provider abstraction
//!
//! The route layer only talks to this trait; the OAuth handshake
//! itself lives in the implementation.

use axum::async_trait;
use url::Url;

use crate::error::Result;

/// Authenticated principal returned by an identity provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable subject identifier at the provider
    pub subject: String,
    /// Display name, if the provider shared one
    pub name: Option<String>,
    pub email: Option<String>,
}

/// External identity provider adapter
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &'static str;

    /// Build the URL that starts the provider's consent flow
    ///
    /// `return_path` is where the provider sends the browser back to.
    fn authorization_url(&self, return_path: &str) -> Result<Url>;

    /// Trade an authorization code for the caller's identity
    async fn exchange(&self, code: &str, return_path: &str) -> Result<Identity>;
}
