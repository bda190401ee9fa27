use serde::{Deserialize, Serialize};

use crate::mvp::MvpRecord;
use crate::player::{PlayerId, Vec3};
use crate::rules::GameRules;
use crate::session::SessionState;
use crate::tagging::TagEvent;

/// Network message type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    // Client -> Server
    Join = 0x01,
    Move = 0x02,
    TagAttempt = 0x03,
    ShieldExpired = 0x04,
    Leave = 0x05,

    // Server -> Client
    JoinAck = 0x10,
    GameState = 0x11,
    Tagged = 0x12,
    GameOver = 0x13,
}

impl MessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::Join),
            0x02 => Some(Self::Move),
            0x03 => Some(Self::TagAttempt),
            0x04 => Some(Self::ShieldExpired),
            0x05 => Some(Self::Leave),
            0x10 => Some(Self::JoinAck),
            0x11 => Some(Self::GameState),
            0x12 => Some(Self::Tagged),
            0x13 => Some(Self::GameOver),
            _ => None,
        }
    }
}

/// First message on every connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinMsg {
    pub username: String,
    /// 0 means "unversioned"; anything else must match the server.
    pub protocol_version: u8,
}

/// Position update from a client, at most a few dozen per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveMsg {
    pub position: Vec3,
    pub rotation: f32,
    /// Distance covered since the previous move message.
    pub distance_delta: f32,
}

/// Explicit tag request. The id must match the sending connection; the
/// reported position is informational — the server resolves tags against
/// its own last-applied positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagAttemptMsg {
    pub id: PlayerId,
    pub position: Vec3,
}

/// Client-timed shield expiry for the sender's own player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShieldExpiredMsg {
    pub id: PlayerId,
}

/// Graceful leave; the connection close path covers abrupt exits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveMsg {
    pub id: PlayerId,
}

/// Direct reply to a Join: the assigned id plus the active rule set, so the
/// client's timers and radii agree with the server's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinAckMsg {
    pub success: bool,
    pub player_id: Option<PlayerId>,
    pub rules: Option<GameRules>,
    pub error: Option<String>,
}

/// Full authoritative snapshot, broadcast after every mutation and on each
/// countdown tick while a round is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStateMsg {
    pub state: SessionState,
}

/// One conversion: who caught whom, and whether it ended the round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedMsg {
    pub id: PlayerId,
    pub tagger_id: PlayerId,
    pub position: Vec3,
    pub is_last_tag: bool,
}

impl From<TagEvent> for TaggedMsg {
    fn from(ev: TagEvent) -> Self {
        Self {
            id: ev.id,
            tagger_id: ev.tagger_id,
            position: ev.position,
            is_last_tag: ev.is_last_tag,
        }
    }
}

/// Round outcome: which side won and who stood out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameOverMsg {
    pub runners_won: bool,
    pub mvp: Option<MvpRecord>,
}

/// Every message a client may send.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Join(JoinMsg),
    Move(MoveMsg),
    TagAttempt(TagAttemptMsg),
    ShieldExpired(ShieldExpiredMsg),
    Leave(LeaveMsg),
}

impl ClientMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Join(_) => MessageType::Join,
            Self::Move(_) => MessageType::Move,
            Self::TagAttempt(_) => MessageType::TagAttempt,
            Self::ShieldExpired(_) => MessageType::ShieldExpired,
            Self::Leave(_) => MessageType::Leave,
        }
    }
}

/// Every message the server may send.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    JoinAck(JoinAckMsg),
    GameState(Box<GameStateMsg>),
    Tagged(TaggedMsg),
    GameOver(GameOverMsg),
}

impl ServerMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::JoinAck(_) => MessageType::JoinAck,
            Self::GameState(_) => MessageType::GameState,
            Self::Tagged(_) => MessageType::Tagged,
            Self::GameOver(_) => MessageType::GameOver,
        }
    }
}
