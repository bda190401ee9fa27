use axum::Json;
use axum::extract::State;
use serde::Serialize;

use tagarena_core::session::SessionState;

use crate::error::AppError;
use crate::state::AppState;

/// Status payload: the live session snapshot plus the server version.
#[derive(Serialize)]
pub struct StatusResponse {
    pub version: &'static str,
    pub session: SessionState,
}

/// GET /api/v1/status — JSON view of the authoritative session state,
/// served by a oneshot query into the session loop.
pub async fn get_status(State(state): State<AppState>) -> Result<Json<StatusResponse>, AppError> {
    let session = state
        .snapshot()
        .await
        .ok_or_else(|| AppError::ServiceUnavailable("session loop unavailable".to_string()))?;
    Ok(Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        session,
    }))
}
