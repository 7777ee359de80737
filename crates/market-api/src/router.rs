//! Route definitions for the marketplace session API.
//!
//! All routes are mounted under `/api`. Protected routes sit behind the
//! authentication gate via `route_layer`, so unmatched paths still 404.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::middleware::cors::build_cors_layer;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()));

    let cors = build_cors_layer(&state.config.server.cors);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(
            middleware::logging::request_logging,
        ))
        .with_state(state)
}

/// Login and liveness.
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/health", get(handlers::health::health))
}

/// Endpoints that require a valid bearer credential.
fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::me))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ))
}
