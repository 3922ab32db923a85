//! Axum WebSocket server for the simulated gateway.
//!
//! # Endpoints
//!
//! - `GET /` and `GET /ws`: WebSocket upgrade, one [`run_session`] per socket.
//! - `GET /health`: `{ "status": "ok", "sessions": 2, "clients": 6, "uptime_secs": 120 }`

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;

use super::feed::FeedFrame;
use super::session::run_session;

// ════════════════════════════════════════════════════════════════════
// Shared server state
// ════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub(crate) struct ServerState {
    /// Fan-out of generated frames to every session.
    pub frames: broadcast::Sender<Arc<FeedFrame>>,
    /// Token sessions must present, if any.
    pub token: Option<Arc<str>>,
    pub sessions: Arc<AtomicUsize>,
    pub simulated_clients: usize,
    pub started_at: Instant,
}

// ════════════════════════════════════════════════════════════════════
// Router
// ════════════════════════════════════════════════════════════════════

pub(crate) fn router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(ws_upgrade_handler))
        .route("/ws", get(ws_upgrade_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

// ════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════

async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    State(state): State<ServerState>,
) -> impl IntoResponse {
    tracing::debug!("{}: upgrading WebSocket connection", remote_addr);
    ws.on_upgrade(move |socket| async move {
        state.sessions.fetch_add(1, Ordering::Relaxed);
        run_session(socket, remote_addr, &state).await;
        state.sessions.fetch_sub(1, Ordering::Relaxed);
    })
}

async fn health_handler(State(state): State<ServerState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "sessions": state.sessions.load(Ordering::Relaxed),
        "clients": state.simulated_clients,
        "uptime_secs": state.started_at.elapsed().as_secs(),
    }))
}
