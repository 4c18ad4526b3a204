//! Prometheus scrape endpoint

use axum::{
    Router,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus::{Encoder, TextEncoder};

use crate::error::{AppError, Result};
use crate::metrics::REGISTRY;

/// GET /metrics
///
/// Renders the registry in Prometheus text exposition format.
async fn scrape() -> Result<Response> {
    let encoder = TextEncoder::new();
    let body = encoder
        .encode_to_string(&REGISTRY.gather())
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok(([(header::CONTENT_TYPE, encoder.format_type())], body).into_response())
}

/// Create metrics router
///
/// The gate is applied by the top-level router composition.
pub fn metrics_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/metrics", get(scrape))
}
