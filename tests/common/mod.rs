//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::sync::Arc;

use authgate::auth::{CookieSessionStore, Identity, IdentityProvider};
use authgate::error::AppError;
use authgate::{AppState, config};
use axum::async_trait;
use tokio::net::TcpListener;
use url::Url;

pub const SESSION_SECRET: &str = "test-secret-key-32-bytes-long!!!";

/// Identity provider that accepts `code=<username>` and treats
/// `code=unreachable` as a provider outage
pub struct FakeProvider;

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn authorization_url(&self, return_path: &str) -> Result<Url, AppError> {
        let mut url = Url::parse("https://idp.test/authorize").expect("static url");
        url.query_pairs_mut()
            .append_pair("client_id", "test-client-id")
            .append_pair("redirect_uri", return_path);
        Ok(url)
    }

    async fn exchange(&self, code: &str, _return_path: &str) -> Result<Identity, AppError> {
        if code == "unreachable" {
            return Err(AppError::Provider("connection refused".to_string()));
        }
        Ok(Identity {
            subject: format!("sub-{code}"),
            name: Some(code.to_string()),
            email: Some(format!("{code}@example.com")),
        })
    }
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    /// Client that keeps cookies between requests and never follows redirects
    pub client: reqwest::Client,
}

pub fn test_config() -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
            domain: "localhost".to_string(),
            protocol: "http".to_string(),
        },
        auth: config::AuthConfig {
            session_secret: SESSION_SECRET.to_string(),
            session_max_age: 3600,
            cookie_name: "session".to_string(),
            google: config::GoogleOAuthConfig {
                client_id: "test-client-id".to_string(),
                client_secret: "test-client-secret".to_string(),
                auth_url: "https://idp.test/authorize".to_string(),
                token_url: "https://idp.test/token".to_string(),
                userinfo_url: "https://idp.test/userinfo".to_string(),
                scopes: vec!["openid".to_string()],
            },
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

impl TestServer {
    /// Start a server backed by `FakeProvider`
    pub async fn new() -> Self {
        let config = test_config();
        let sessions =
            CookieSessionStore::new(&config.auth.session_secret, config.auth.session_max_age);
        let state = AppState::with_components(config, Arc::new(FakeProvider), Arc::new(sessions));
        Self::start(state).await
    }

    /// Start a server around an already-built state
    pub async fn start(state: AppState) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = authgate::build_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    pub async fn get_json(&self, path: &str) -> (u16, serde_json::Value) {
        let response = self.client.get(self.url(path)).send().await.unwrap();
        let status = response.status().as_u16();
        let body = response.json().await.unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    /// Complete the provider callback as `user`; returns the issued session token
    pub async fn login_as(&self, user: &str) -> String {
        let response = self
            .client
            .get(self.url(&format!("/api/auth/callback?code={user}")))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        session_cookie_value(&response).expect("callback sets session cookie")
    }
}

/// Extract the session token from a response's Set-Cookie headers
pub fn session_cookie_value(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter_map(|pair| pair.strip_prefix("session="))
        .find(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}
