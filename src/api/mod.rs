//! API layer
//!
//! HTTP handlers for:
//! - Public greeting
//! - Authenticated endpoint
//! - Sign-in flow (see `auth`)
//! - Metrics (Prometheus)

mod hello;
pub mod metrics;
mod secure;

use axum::{Router, middleware, routing::get};

use crate::AppState;
use crate::auth::{auth_router, require_auth};

pub use hello::{HelloResponse, hello};
pub use metrics::metrics_router;
pub use secure::{SecureResponse, secure};

/// Create API router (mounted at `/api`)
///
/// Only `/secure` sits behind the authorization gate.
pub fn api_router(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .route("/secure", get(secure))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/hello", get(hello))
        .nest("/auth", auth_router())
        .merge(protected_routes)
}
