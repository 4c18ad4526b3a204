//! Google OAuth flow
//!
//! Implements the OAuth 2.0 authorization code flow against Google
//! (or any OpenID Connect provider with the same endpoints).
//!
//! # Steps
//! 1. Redirect to the authorization endpoint with client_id, redirect_uri, scope
//! 2. Exchange the returned code for an access token
//! 3. Fetch the user's profile from the userinfo endpoint

use std::borrow::Cow;

use axum::async_trait;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;
use url::Url;

use super::provider::{Identity, IdentityProvider};
use crate::config::AppConfig;
use crate::error::{AppError, Result};

type GoogleClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Google userinfo response
#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    name: Option<String>,
    email: Option<String>,
}

impl From<GoogleUserInfo> for Identity {
    fn from(info: GoogleUserInfo) -> Self {
        Identity {
            subject: info.sub,
            name: info.name,
            email: info.email,
        }
    }
}

/// Identity provider backed by Google sign-in
pub struct GoogleProvider {
    client: GoogleClient,
    scopes: Vec<String>,
    userinfo_url: Url,
    config: AppConfig,
    http_client: reqwest::Client,
}

impl GoogleProvider {
    /// Build the provider from configuration
    ///
    /// `http_client` must not follow redirects; the token endpoint
    /// is called with client credentials attached.
    pub fn new(config: &AppConfig, http_client: reqwest::Client) -> Result<Self> {
        let google = &config.auth.google;

        let auth_url = AuthUrl::new(google.auth_url.clone())
            .map_err(|e| AppError::Config(format!("auth.google.auth_url: {e}")))?;
        let token_url = TokenUrl::new(google.token_url.clone())
            .map_err(|e| AppError::Config(format!("auth.google.token_url: {e}")))?;
        let userinfo_url = Url::parse(&google.userinfo_url)
            .map_err(|e| AppError::Config(format!("auth.google.userinfo_url: {e}")))?;

        let client = BasicClient::new(ClientId::new(google.client_id.clone()))
            .set_client_secret(ClientSecret::new(google.client_secret.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url);

        Ok(Self {
            client,
            scopes: google.scopes.clone(),
            userinfo_url,
            config: config.clone(),
            http_client,
        })
    }

    fn redirect_url(&self, return_path: &str) -> Result<RedirectUrl> {
        RedirectUrl::new(self.config.callback_url(return_path))
            .map_err(|e| AppError::Config(format!("invalid callback URL: {e}")))
    }

    async fn fetch_userinfo(&self, access_token: &str) -> Result<GoogleUserInfo> {
        let info = self
            .http_client
            .get(self.userinfo_url.clone())
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?
            .json::<GoogleUserInfo>()
            .await?;
        Ok(info)
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    fn authorization_url(&self, return_path: &str) -> Result<Url> {
        let redirect_url = self.redirect_url(return_path)?;

        let (url, _state) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.scopes.iter().cloned().map(Scope::new))
            .set_redirect_uri(Cow::Owned(redirect_url))
            .url();

        Ok(url)
    }

    async fn exchange(&self, code: &str, return_path: &str) -> Result<Identity> {
        let redirect_url = self.redirect_url(return_path)?;

        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_redirect_uri(Cow::Owned(redirect_url))
            .request_async(&self.http_client)
            .await
            .map_err(|e| AppError::Provider(format!("token exchange failed: {e}")))?;

        let info = self.fetch_userinfo(token.access_token().secret()).await?;
        tracing::debug!(subject = %info.sub, "Fetched userinfo");

        Ok(info.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::valid_config;

    fn provider() -> GoogleProvider {
        GoogleProvider::new(&valid_config(), reqwest::Client::new()).unwrap()
    }

    fn query_value(url: &Url, key: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn authorization_url_targets_google() {
        let url = provider().authorization_url("/api/auth/callback").unwrap();

        assert!(
            url.as_str()
                .starts_with("https://accounts.google.com/o/oauth2/v2/auth?")
        );
        assert_eq!(query_value(&url, "response_type").as_deref(), Some("code"));
        assert_eq!(
            query_value(&url, "client_id").as_deref(),
            Some("google-client-id")
        );
        assert_eq!(
            query_value(&url, "redirect_uri").as_deref(),
            Some("http://localhost:8080/api/auth/callback")
        );
        assert_eq!(
            query_value(&url, "scope").as_deref(),
            Some("openid email profile")
        );
    }

    #[test]
    fn invalid_endpoint_is_a_config_error() {
        let mut config = valid_config();
        config.auth.google.token_url = "not a url".to_string();

        let result = GoogleProvider::new(&config, reqwest::Client::new());
        assert!(matches!(
            result,
            Err(AppError::Config(message)) if message.contains("auth.google.token_url")
        ));
    }

    #[test]
    fn userinfo_without_name_keeps_subject() {
        let info: GoogleUserInfo = serde_json::from_str(r#"{"sub":"42"}"#).unwrap();
        let identity = Identity::from(info);

        assert_eq!(identity.subject, "42");
        assert_eq!(identity.name, None);
    }
}
