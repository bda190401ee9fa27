use serde::{Deserialize, Serialize};

use super::messages::{
    ClientMessage, GameOverMsg, GameStateMsg, JoinAckMsg, JoinMsg, LeaveMsg, MessageType, MoveMsg,
    ServerMessage, ShieldExpiredMsg, TagAttemptMsg, TaggedMsg,
};

/// Current protocol version, validated at join.
pub const PROTOCOL_VERSION: u8 = 1;

/// Maximum message payload size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

#[derive(Debug)]
pub enum ProtocolError {
    EmptyMessage,
    UnknownMessageType(u8),
    PayloadTooLarge(usize),
    SerializeError(String),
    DeserializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::UnknownMessageType(b) => write!(f, "unknown message type: 0x{b:02x}"),
            Self::PayloadTooLarge(size) => {
                write!(f, "payload too large: {size} bytes (max {MAX_MESSAGE_SIZE})")
            },
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
            Self::DeserializeError(e) => write!(f, "deserialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Encode a serializable payload with a 1-byte type prefix.
pub fn encode_message<T: Serialize>(
    msg_type: MessageType,
    payload: &T,
) -> Result<Vec<u8>, ProtocolError> {
    let payload_bytes =
        rmp_serde::to_vec(payload).map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    let total = 1 + payload_bytes.len();
    if total > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(total));
    }
    let mut buf = Vec::with_capacity(total);
    buf.push(msg_type as u8);
    buf.extend_from_slice(&payload_bytes);
    Ok(buf)
}

/// Encode a `ClientMessage` to wire format.
pub fn encode_client_message(msg: &ClientMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ClientMessage::Join(m) => encode_message(MessageType::Join, m),
        ClientMessage::Move(m) => encode_message(MessageType::Move, m),
        ClientMessage::TagAttempt(m) => encode_message(MessageType::TagAttempt, m),
        ClientMessage::ShieldExpired(m) => encode_message(MessageType::ShieldExpired, m),
        ClientMessage::Leave(m) => encode_message(MessageType::Leave, m),
    }
}

/// Encode a `ServerMessage` to wire format.
pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ServerMessage::JoinAck(m) => encode_message(MessageType::JoinAck, m),
        ServerMessage::GameState(m) => encode_message(MessageType::GameState, m.as_ref()),
        ServerMessage::Tagged(m) => encode_message(MessageType::Tagged, m),
        ServerMessage::GameOver(m) => encode_message(MessageType::GameOver, m),
    }
}

/// Extract the message type byte from raw wire data.
pub fn decode_message_type(data: &[u8]) -> Result<MessageType, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    MessageType::from_byte(data[0]).ok_or(ProtocolError::UnknownMessageType(data[0]))
}

/// Decode a MessagePack payload (bytes after the type prefix).
pub fn decode_payload<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    rmp_serde::from_slice(&data[1..]).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

/// Decode raw wire data into a `ClientMessage`.
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::Join => Ok(ClientMessage::Join(decode_payload::<JoinMsg>(data)?)),
        MessageType::Move => Ok(ClientMessage::Move(decode_payload::<MoveMsg>(data)?)),
        MessageType::TagAttempt => Ok(ClientMessage::TagAttempt(
            decode_payload::<TagAttemptMsg>(data)?,
        )),
        MessageType::ShieldExpired => Ok(ClientMessage::ShieldExpired(decode_payload::<
            ShieldExpiredMsg,
        >(data)?)),
        MessageType::Leave => Ok(ClientMessage::Leave(decode_payload::<LeaveMsg>(data)?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}

/// Decode raw wire data into a `ServerMessage`.
pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::JoinAck => Ok(ServerMessage::JoinAck(decode_payload::<JoinAckMsg>(data)?)),
        MessageType::GameState => Ok(ServerMessage::GameState(Box::new(decode_payload::<
            GameStateMsg,
        >(data)?))),
        MessageType::Tagged => Ok(ServerMessage::Tagged(decode_payload::<TaggedMsg>(data)?)),
        MessageType::GameOver => Ok(ServerMessage::GameOver(decode_payload::<GameOverMsg>(
            data,
        )?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}
