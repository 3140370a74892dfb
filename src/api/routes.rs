use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::rate_limit::rate_limit_middleware;
use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    // Recommendation traffic is rate limited per client; the config and
    // health endpoints are not
    let limited = Router::new()
        .route("/recommendations", post(handlers::recommend))
        .layer(from_fn_with_state(state.limiter.clone(), rate_limit_middleware));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/config",
            get(handlers::get_config).patch(handlers::update_config),
        )
        .merge(limited)
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
