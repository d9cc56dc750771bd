use super::state::AppState;
use super::ws::handle_socket;
use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::net::SocketAddr;
use tracing::warn;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// GET / and GET /ws
/// Upgrade to a streaming recognition session
pub async fn recognize(
    ws: WebSocketUpgrade,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    let Some(slot) = state.try_reserve() else {
        warn!("Rejecting connection from {}: session limit reached", remote_addr);
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "Too many active sessions".to_string(),
            }),
        )
            .into_response();
    };

    ws.on_upgrade(move |socket| handle_socket(socket, remote_addr, state, slot))
}

/// GET /stats
/// Session counters
pub async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.stats()))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
