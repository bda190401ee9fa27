use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use tagarena_core::session::RoundPhase;

use crate::state::AppState;

/// Structured health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub connections: ConnectionInfo,
    pub session: SessionInfo,
}

#[derive(Serialize)]
pub struct ConnectionInfo {
    pub websocket: usize,
}

#[derive(Serialize)]
pub struct SessionInfo {
    pub players: usize,
    pub phase: Option<RoundPhase>,
}

/// Structured health check endpoint: server status, connection count, and a
/// live session summary as JSON.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ws = state.ws_connection_count.load(Ordering::Relaxed);
    let snapshot = state.snapshot().await;

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        connections: ConnectionInfo { websocket: ws },
        session: SessionInfo {
            players: snapshot.as_ref().map(|s| s.player_count).unwrap_or(0),
            phase: snapshot.map(|s| s.phase),
        },
    })
}

/// Readiness check — the server is ready once the session loop is serving
/// queries.
pub async fn readiness_check(State(state): State<AppState>) -> &'static str {
    if state.commands.is_closed() {
        return "not ready: session loop stopped";
    }
    "ready"
}
