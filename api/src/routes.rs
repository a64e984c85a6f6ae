use axum::{
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::{cloudfront_middleware, signature_middleware};
use crate::state::AppState;

/// Slack gives up on slash commands well before this
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Create the main application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    // Public routes (no signature required)
    let public_routes = Router::new()
        .route("/healthz", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::metrics_handler));

    // Slack routes (signed requests only). The origin token is checked
    // before the signature; health probes never carry it.
    let slack_routes = Router::new()
        .route(
            "/v1/slack/command",
            post(handlers::commands::handle_slash_command),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            signature_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            cloudfront_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(slack_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(REQUEST_TIMEOUT)),
        )
        .with_state(state)
}
