use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::sync::{mpsc, oneshot};

use tagarena_core::player::PlayerId;
use tagarena_core::session::SessionState;

use crate::config::ServerConfig;
use crate::session_loop::{SessionCommand, spawn_session_loop};

#[derive(Clone)]
pub struct AppState {
    /// Command queue into the single-writer session loop — the only path
    /// to session state.
    pub commands: mpsc::UnboundedSender<SessionCommand>,
    pub next_player_id: Arc<AtomicU64>,
    pub ws_connection_count: Arc<AtomicUsize>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Build app state and spawn the session loop. Must run inside a tokio
    /// runtime.
    pub fn new(config: ServerConfig) -> Self {
        let config = Arc::new(config);
        let commands = spawn_session_loop(Arc::clone(&config));
        Self {
            commands,
            next_player_id: Arc::new(AtomicU64::new(1)),
            ws_connection_count: Arc::new(AtomicUsize::new(0)),
            config,
        }
    }

    pub fn alloc_player_id(&self) -> PlayerId {
        self.next_player_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Query the live session state from the loop.
    pub async fn snapshot(&self) -> Option<SessionState> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::Snapshot { reply })
            .ok()?;
        rx.await.ok()
    }
}

/// RAII guard for the global WebSocket connection counter.
pub struct ConnectionGuard {
    count: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    pub fn new(count: Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::Relaxed);
        Self { count }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::Relaxed);
    }
}
