//! Authgate - a small API that delegates sign-in to an OAuth identity provider
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - /api/hello (public)                                      │
//! │  - /api/auth/{login,callback,logout,status}                 │
//! │  - /api/secure (behind require_auth)                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Auth Layer                              │
//! │  - IdentityProvider (Google via oauth2)                     │
//! │  - SessionStore (HMAC-signed cookie + revocation list)      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers
//! - `auth`: Identity provider, sessions and the authorization gate
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;

use std::sync::Arc;

use auth::{CookieSessionStore, GoogleProvider, IdentityProvider, SessionStore};

/// Application state shared across all handlers
///
/// Cloned for each request; every field is reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Identity provider adapter
    pub provider: Arc<dyn IdentityProvider>,

    /// Session credential store
    pub sessions: Arc<dyn SessionStore>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Validate the configuration
    /// 2. Build the HTTP client used for provider calls
    /// 3. Configure the Google identity provider
    /// 4. Create the cookie session store
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub fn new(config: config::AppConfig) -> error::Result<Self> {
        tracing::info!("Initializing application state...");

        config.validate()?;

        // Provider calls must not follow redirects
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("Authgate/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let provider = GoogleProvider::new(&config, http_client)?;
        tracing::info!(
            provider = provider.name(),
            client_id = %config.auth.google.client_id,
            "Identity provider configured"
        );

        let sessions =
            CookieSessionStore::new(&config.auth.session_secret, config.auth.session_max_age);

        Ok(Self::with_components(
            config,
            Arc::new(provider),
            Arc::new(sessions),
        ))
    }

    /// Assemble state from already-built collaborators
    pub fn with_components(
        config: config::AppConfig,
        provider: Arc<dyn IdentityProvider>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            provider,
            sessions,
        }
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, middleware};
    use tower_http::trace::TraceLayer;

    let cors_layer = build_cors_layer(&state.config.server);

    let metrics_routes = api::metrics_router().route_layer(middleware::from_fn_with_state(
        state.clone(),
        auth::require_auth,
    ));

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .nest("/api", api::api_router(state.clone()))
        .merge(metrics_routes)
        .layer(middleware::from_fn(record_request))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if !server.protocol.eq_ignore_ascii_case("https") {
        return CorsLayer::permissive();
    }

    let allowed_origin = server.base_url();
    match HeaderValue::from_str(&allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods(Any)
            .allow_headers(Any),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from server base URL; denying cross-origin requests"
            );
            CorsLayer::new().allow_methods(Any).allow_headers(Any)
        }
    }
}

/// Count requests per matched route
async fn record_request(
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let endpoint = request
        .extensions()
        .get::<axum::extract::MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_string());

    metrics::HTTP_REQUESTS_TOTAL
        .with_label_values(&[endpoint.as_str()])
        .inc();

    next.run(request).await
}

async fn health_check() -> &'static str {
    "OK"
}
