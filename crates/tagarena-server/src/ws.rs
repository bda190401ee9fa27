use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use tagarena_core::net::messages::{ClientMessage, JoinAckMsg, ServerMessage};
use tagarena_core::net::protocol::{
    MAX_MESSAGE_SIZE, PROTOCOL_VERSION, decode_client_message, encode_server_message,
};
use tagarena_core::player::PlayerId;

use crate::session_loop::SessionCommand;
use crate::state::{AppState, ConnectionGuard};

pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, StatusCode> {
    let max_ws = state.config.limits.max_ws_connections;
    let current = state.ws_connection_count.load(Ordering::Relaxed);
    if current >= max_ws {
        tracing::warn!(current, max = max_ws, "WS connection limit reached");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state)))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let _guard = ConnectionGuard::new(Arc::clone(&state.ws_connection_count));
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // The first frame must be a Join.
    let first_msg = match ws_receiver.next().await {
        Some(Ok(Message::Binary(data))) => data,
        _ => return,
    };
    let Ok(ClientMessage::Join(join)) = decode_client_message(&first_msg) else {
        return;
    };

    // Validate protocol version (0 = unversioned client).
    if join.protocol_version != 0 && join.protocol_version != PROTOCOL_VERSION {
        send_join_error(
            &mut ws_sender,
            &format!(
                "Protocol version mismatch: client={}, server={PROTOCOL_VERSION}",
                join.protocol_version
            ),
        )
        .await;
        return;
    }

    let username = join.username.trim().to_string();
    if username.is_empty() || username.len() > 32 || username.chars().any(|c| c.is_control()) {
        send_join_error(&mut ws_sender, "Invalid player name").await;
        return;
    }

    let player_id = state.alloc_player_id();
    let (tx, rx) = mpsc::channel::<Bytes>(state.config.limits.player_message_buffer);

    // Ack directly on this socket before the writer task takes over, so the
    // client learns its id and the rule set before the first broadcast.
    let ack = ServerMessage::JoinAck(JoinAckMsg {
        success: true,
        player_id: Some(player_id),
        rules: Some(state.config.game.clone()),
        error: None,
    });
    let Ok(response) = encode_server_message(&ack) else {
        tracing::warn!("Failed to encode JoinAck");
        return;
    };
    if ws_sender
        .send(Message::Binary(response.into()))
        .await
        .is_err()
    {
        return;
    }

    if state
        .commands
        .send(SessionCommand::Join {
            id: player_id,
            username,
            sender: tx,
        })
        .is_err()
    {
        // Session loop gone; nothing to register or clean up.
        return;
    }
    tracing::info!(player_id, "Player connected");

    spawn_writer(ws_sender, rx);
    read_loop(&mut ws_receiver, &state, player_id).await;

    // Socket closed or client left — remove the player. The loop handles
    // the forfeit transition if this breaks an active round's quorum.
    let _ = state.commands.send(SessionCommand::Leave { id: player_id });
    tracing::info!(player_id, "Player disconnected");
}

async fn send_join_error(
    ws_sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    error: &str,
) {
    let msg = ServerMessage::JoinAck(JoinAckMsg {
        success: false,
        player_id: None,
        rules: None,
        error: Some(error.to_string()),
    });
    if let Ok(response) = encode_server_message(&msg)
        && let Err(e) = ws_sender.send(Message::Binary(response.into())).await
    {
        tracing::warn!(error = %e, "Failed to send join error response");
    }
}

fn spawn_writer(
    mut ws_sender: futures::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Bytes>,
) {
    tokio::spawn(async move {
        while let Some(data) = rx.recv().await {
            if ws_sender
                .send(Message::Binary(data.to_vec().into()))
                .await
                .is_err()
            {
                break;
            }
        }
    });
}

/// Per-connection rate limiter (token bucket).
struct RateLimiter {
    tokens: f64,
    last_refill: tokio::time::Instant,
    max_tokens: f64,
    refill_rate: f64, // tokens per second
}

impl RateLimiter {
    fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            tokens: max_tokens,
            last_refill: tokio::time::Instant::now(),
            max_tokens,
            refill_rate,
        }
    }

    /// Returns true if the message is allowed; false if rate-limited.
    fn allow(&mut self) -> bool {
        let now = tokio::time::Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

async fn read_loop(
    ws_receiver: &mut futures::stream::SplitStream<WebSocket>,
    state: &AppState,
    player_id: PlayerId,
) {
    let rate = state.config.limits.ws_rate_limit_per_sec;
    let mut rate_limiter = RateLimiter::new(rate, rate);

    while let Some(Ok(msg)) = ws_receiver.next().await {
        let data = match msg {
            Message::Binary(d) => d,
            Message::Close(_) => break,
            _ => continue,
        };

        if !rate_limiter.allow() {
            tracing::warn!(player_id, "Rate limited");
            continue;
        }
        if data.is_empty() || data.len() > MAX_MESSAGE_SIZE {
            continue;
        }

        // Malformed frames are invalid-but-harmless: drop and move on.
        let Ok(msg) = decode_client_message(&data) else {
            continue;
        };

        match msg {
            ClientMessage::Move(m) => {
                // Reject NaN/Inf before they can corrupt positions.
                if !m.position.x.is_finite()
                    || !m.position.y.is_finite()
                    || !m.position.z.is_finite()
                    || !m.rotation.is_finite()
                {
                    continue;
                }
                let distance_delta = if m.distance_delta.is_finite() {
                    m.distance_delta
                } else {
                    0.0
                };
                let _ = state.commands.send(SessionCommand::Move {
                    id: player_id,
                    position: m.position,
                    rotation: m.rotation,
                    distance_delta,
                });
            },
            ClientMessage::TagAttempt(m) => {
                // Reject spoofed attempts for other players.
                if m.id != player_id {
                    tracing::debug!(player_id, claimed = m.id, "Spoofed tag attempt dropped");
                    continue;
                }
                let _ = state
                    .commands
                    .send(SessionCommand::TagAttempt { id: player_id });
            },
            ClientMessage::ShieldExpired(m) => {
                if m.id != player_id {
                    tracing::debug!(player_id, claimed = m.id, "Spoofed shield expiry dropped");
                    continue;
                }
                let _ = state
                    .commands
                    .send(SessionCommand::ShieldExpired { id: player_id });
            },
            ClientMessage::Leave(_) => break,
            ClientMessage::Join(_) => {
                tracing::debug!(player_id, "Duplicate join ignored");
            },
        }
    }
}
