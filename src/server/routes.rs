use super::handlers;
use super::state::AppState;
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

/// Create the router with the streaming endpoint and service routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Streaming recognition (websocket upgrade)
        .route("/", get(handlers::recognize))
        .route("/ws", get(handlers::recognize))
        // Service
        .route("/health", get(handlers::health_check))
        .route("/stats", get(handlers::get_stats))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
