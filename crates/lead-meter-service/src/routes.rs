//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{health, webhook};
use crate::state::AppState;

/// Maximum concurrent in-flight webhook requests.
const WEBHOOK_MAX_CONCURRENT_REQUESTS: usize = 256;

/// Slack between the webhook's own deadline and the outer timeout layer, so
/// the handler answers first. The layer only catches stalled request bodies.
const TIMEOUT_LAYER_GRACE: Duration = Duration::from_secs(1);

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// - `GET /` - Liveness probe (plain text)
/// - `GET /health` - Health check (JSON)
/// - `POST /ghl-webhook` - CRM lead-created webhook
pub fn create_router(state: AppState) -> Router {
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = state.config.request_timeout();

    let state = Arc::new(state);

    let webhook_routes = Router::new()
        .route("/ghl-webhook", post(webhook::ghl_webhook))
        .layer(ConcurrencyLimitLayer::new(WEBHOOK_MAX_CONCURRENT_REQUESTS));

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .merge(webhook_routes)
        // Global middleware. Oversized bodies surface as a body rejection in
        // the webhook handler instead of a bare 413.
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TimeoutLayer::new(request_timeout + TIMEOUT_LAYER_GRACE))
        .with_state(state)
}
