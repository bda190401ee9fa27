use serde::{Deserialize, Serialize};

/// Gameplay constants shared between server and clients.
///
/// These are configuration, not protocol, but changing any of them changes
/// observable timing behavior, so the server echoes the active set to every
/// client in the join acknowledgement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    /// Round length in seconds.
    pub round_duration_secs: u32,
    /// Planar distance below which a tag lands. One constant for both the
    /// reactive per-move check and the explicit tag-attempt path.
    pub tag_radius: f32,
    /// Minimum gap between successful tags by the same chaser.
    pub tag_cooldown_ms: u64,
    /// How long a join/respawn shield lasts. Clients time this themselves
    /// and report expiry; the server only records it.
    pub shield_duration_secs: u32,
    /// Delay between the round-over broadcast and the reset, during which
    /// clients display the outcome.
    pub reset_delay_secs: u64,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            round_duration_secs: 600,
            tag_radius: 2.5,
            tag_cooldown_ms: 1_000,
            shield_duration_secs: 3,
            reset_delay_secs: 5,
        }
    }
}
