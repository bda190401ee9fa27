pub mod api;
pub mod config;
pub mod error;
pub mod health;
pub mod session_loop;
pub mod state;
pub mod ws;

use axum::Router;
use tower_http::cors::CorsLayer;

use config::ServerConfig;
use state::AppState;

/// Build the Axum router and application state from a config. Spawns the
/// session loop; the returned state holds its command handle.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    let state = AppState::new(config);

    let app = Router::new()
        .route("/ws", axum::routing::get(ws::ws_handler))
        .route("/healthz", axum::routing::get(health::health_check))
        .route("/readyz", axum::routing::get(health::readiness_check))
        .route("/api/v1/status", axum::routing::get(api::get_status))
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    (app, state)
}
