//! Websocket server for streaming recognition
//!
//! Routes:
//! - GET / and GET /ws - Upgrade to a streaming session
//! - GET /stats - Session counters
//! - GET /health - Health check
//!
//! Each accepted connection runs as its own task with its own session and
//! recognizer; a failing session never touches the others.

mod emitter;
mod handlers;
mod routes;
mod state;
mod ws;

pub use emitter::ResultEmitter;
pub use routes::create_router;
pub use state::{AppState, ServerStats, SessionEnd, SessionSlot};
pub use ws::{run_session, SessionOutcome};

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

/// Bind the listener and serve until the process stops
pub async fn serve(addr: &str, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(
        "Listening on {} ({} recognizer)",
        listener.local_addr()?,
        state.factory.name()
    );

    serve_with_listener(listener, state).await
}

/// Serve on an already bound listener
///
/// Handlers see the peer address through `ConnectInfo<SocketAddr>`.
pub async fn serve_with_listener(listener: TcpListener, state: AppState) -> Result<()> {
    let app = create_router(state).into_make_service_with_connect_info::<SocketAddr>();

    axum::serve(listener, app)
        .await
        .context("Server error")
}
