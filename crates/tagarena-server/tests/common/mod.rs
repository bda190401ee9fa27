use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use tagarena_core::net::messages::{ClientMessage, JoinAckMsg, JoinMsg, ServerMessage};
use tagarena_core::net::protocol::{
    PROTOCOL_VERSION, decode_server_message, encode_client_message,
};
use tagarena_core::player::PlayerId;
use tagarena_core::session::SessionState;

use tagarena_server::build_app;
use tagarena_server::config::ServerConfig;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a test server with short round timers.
    pub async fn new() -> Self {
        Self::from_config(test_config()).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, _state) = build_app(config);
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// Short timers so round-lifecycle tests finish in seconds.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        game: tagarena_core::test_helpers::test_rules(),
        ..ServerConfig::default()
    }
}

/// Connect a WebSocket client to the given URL.
pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

/// Send a ClientMessage over a WS stream.
pub async fn ws_send_client_msg(stream: &mut WsStream, msg: &ClientMessage) {
    let encoded = encode_client_message(msg).unwrap();
    stream.send(Message::Binary(encoded.into())).await.unwrap();
}

/// Send a Join and return the JoinAck (success or error).
pub async fn ws_join(stream: &mut WsStream, name: &str) -> JoinAckMsg {
    ws_join_versioned(stream, name, PROTOCOL_VERSION).await
}

/// Send a Join with an explicit protocol version.
pub async fn ws_join_versioned(stream: &mut WsStream, name: &str, version: u8) -> JoinAckMsg {
    let msg = ClientMessage::Join(JoinMsg {
        username: name.to_string(),
        protocol_version: version,
    });
    ws_send_client_msg(stream, &msg).await;

    match ws_read_server_msg(stream).await {
        ServerMessage::JoinAck(ack) => ack,
        other => panic!("Expected JoinAck, got: {other:?}"),
    }
}

/// Read raw binary data from a WebSocket stream (5s timeout).
pub async fn ws_read_raw(stream: &mut WsStream) -> Vec<u8> {
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(Message::Close(_))) => panic!("WebSocket closed unexpectedly"),
                Some(Err(e)) => panic!("WebSocket error: {e}"),
                None => panic!("WebSocket stream ended"),
                _ => continue,
            }
        }
    })
    .await
    .expect("Timed out waiting for WebSocket message")
}

/// Read the next ServerMessage from a WebSocket stream (5s timeout).
pub async fn ws_read_server_msg(stream: &mut WsStream) -> ServerMessage {
    let data = ws_read_raw(stream).await;
    decode_server_message(&data).unwrap()
}

/// Read messages until the next full-state broadcast and return its snapshot.
pub async fn ws_next_state(stream: &mut WsStream) -> SessionState {
    loop {
        if let ServerMessage::GameState(gs) = ws_read_server_msg(stream).await {
            return gs.state;
        }
    }
}

/// Read state broadcasts until one satisfies the predicate.
pub async fn ws_wait_for_state(
    stream: &mut WsStream,
    mut pred: impl FnMut(&SessionState) -> bool,
) -> SessionState {
    for _ in 0..64 {
        let state = ws_next_state(stream).await;
        if pred(&state) {
            return state;
        }
    }
    panic!("No state broadcast matched the predicate");
}

/// Read messages until a round-over broadcast arrives.
pub async fn ws_wait_for_game_over(stream: &mut WsStream) -> tagarena_core::net::messages::GameOverMsg {
    for _ in 0..128 {
        if let ServerMessage::GameOver(go) = ws_read_server_msg(stream).await {
            return go;
        }
    }
    panic!("No GameOver broadcast arrived");
}

/// From a snapshot, pick the chaser and one runner id.
pub fn chaser_and_runner(state: &SessionState) -> (PlayerId, PlayerId) {
    let chaser = state
        .players
        .values()
        .find(|p| p.is_tagger)
        .map(|p| p.id)
        .expect("active round has a chaser");
    let runner = state
        .players
        .values()
        .find(|p| !p.is_tagger)
        .map(|p| p.id)
        .expect("active round has a runner");
    (chaser, runner)
}
