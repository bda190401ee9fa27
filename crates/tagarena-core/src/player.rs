use serde::{Deserialize, Serialize};

/// Unique identifier for a player connection. Ids are allocated
/// monotonically, so sorting by id recovers join order.
pub type PlayerId = u64;

/// Display color for chasers, mirrored by clients.
pub const CHASER_COLOR: &str = "#FF0000";
/// Display color for runners.
pub const RUNNER_COLOR: &str = "#00FFFF";

/// A position in world space. Game logic only ever reads x/z; y is
/// carried through for clients placing avatars on uneven ground.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance on the ground plane, ignoring height.
    /// This is the metric every tag decision uses.
    pub fn planar_distance(&self, other: &Vec3) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }
}

/// A player in the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    pub position: Vec3,
    /// Yaw in radians, relayed for remote avatars; never read by game logic.
    pub rotation: f32,
    /// Derived from the role at every flip site so clients never map roles
    /// to colors themselves.
    pub color: String,
    pub is_tagger: bool,
    pub is_shielded: bool,
    /// Number of successful tags this round.
    pub score: u32,
    /// Total distance covered this round, accumulated from move deltas.
    pub distance_run: f32,
    /// Milliseconds since the Unix epoch of this player's last tag
    /// involvement (as chaser or target); 0 = never.
    pub last_tag_time: u64,
}

impl Player {
    /// A fresh runner at the given spawn position.
    pub fn new(id: PlayerId, username: String, position: Vec3) -> Self {
        Self {
            id,
            username,
            position,
            rotation: 0.0,
            color: RUNNER_COLOR.to_string(),
            is_tagger: false,
            is_shielded: false,
            score: 0,
            distance_run: 0.0,
            last_tag_time: 0,
        }
    }

    /// Flip the chaser role and the derived color together.
    /// Callers are responsible for the session's tagger count.
    pub(crate) fn set_role(&mut self, tagger: bool) {
        self.is_tagger = tagger;
        self.color = if tagger { CHASER_COLOR } else { RUNNER_COLOR }.to_string();
    }
}
