//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::net::IpAddr;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public domain (e.g., "api.example.com" or "localhost:8080")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the public base URL
    ///
    /// # Returns
    /// Full URL like "https://api.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session secret key (32+ bytes)
    pub session_secret: String,
    /// Session max age in seconds (default: 604800 = 7 days)
    pub session_max_age: i64,
    /// Name of the session cookie (default: "session")
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    pub google: GoogleOAuthConfig,
}

fn default_cookie_name() -> String {
    "session".to_string()
}

/// Google OAuth client configuration
///
/// Endpoint URLs default to Google's; overriding them points the
/// adapter at any OpenID Connect provider with the same flow.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_google_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_google_token_url")]
    pub token_url: String,
    #[serde(default = "default_google_userinfo_url")]
    pub userinfo_url: String,
    /// Requested scopes (default: openid, email, profile)
    #[serde(default = "default_google_scopes")]
    pub scopes: Vec<String>,
}

fn default_google_auth_url() -> String {
    GOOGLE_AUTH_URL.to_string()
}

fn default_google_token_url() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

fn default_google_userinfo_url() -> String {
    GOOGLE_USERINFO_URL.to_string()
}

fn default_google_scopes() -> Vec<String> {
    vec![
        "openid".to_string(),
        "email".to_string(),
        "profile".to_string(),
    ]
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl LoggingConfig {
    /// Filter directives used when `RUST_LOG` is unset
    pub fn default_filter(&self) -> String {
        format!("authgate={},tower_http=debug", self.level)
    }

    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (AUTHGATE__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> crate::error::Result<Self> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.domain", "localhost:8080")?
            .set_default("server.protocol", "http")?
            .set_default("auth.session_max_age", 604800)?
            .set_default("auth.cookie_name", "session")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (AUTHGATE__*)
            .add_source(
                Environment::with_prefix("AUTHGATE")
                    .separator("__")
                    .list_separator(" ")
                    .with_list_parse_key("auth.google.scopes")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
            || !is_local_server_domain(&self.server.domain)
    }

    /// Absolute URL the provider sends the browser back to
    pub fn callback_url(&self, return_path: &str) -> String {
        format!("{}{}", self.server.base_url(), return_path)
    }

    pub(crate) fn validate(&self) -> crate::error::Result<()> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;
        // Ten years; longer lifetimes overflow the revocation cache TTL
        const MAX_SESSION_MAX_AGE_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

        if self.auth.session_secret.as_bytes().len() < MIN_SESSION_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        if self.auth.session_max_age > MAX_SESSION_MAX_AGE_SECONDS {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_max_age must be at most {} seconds",
                MAX_SESSION_MAX_AGE_SECONDS
            )));
        }

        if self.auth.cookie_name.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "auth.cookie_name must not be empty".to_string(),
            ));
        }

        if self.auth.google.client_id.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "auth.google.client_id must not be empty".to_string(),
            ));
        }

        if !self.should_use_secure_cookies() {
            let host = normalized_server_host(&self.server.domain);
            tracing::warn!(
                host = %host,
                protocol = %self.server.protocol,
                "Using insecure session cookies for local development"
            );
        } else if !self.server.protocol.eq_ignore_ascii_case("https") {
            return Err(crate::error::AppError::Config(
                "server.protocol must be https for non-local server domains".to_string(),
            ));
        }

        Ok(())
    }
}

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}
