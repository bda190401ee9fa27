use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::arena;
use crate::player::{Player, PlayerId, Vec3};
use crate::rules::GameRules;

/// Lifecycle phase of the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    /// 0–1 players connected; no timer running.
    WaitingForPlayers,
    /// Countdown running, at least one chaser among ≥2 players.
    Active,
    /// Terminal condition reached and outcome broadcast; waiting out the
    /// reset delay while clients display the result.
    Ending,
    /// Role/score/position reassignment in progress. Never observable by
    /// clients: the next broadcast happens after the reset completes.
    Resetting,
}

/// What a player removal obliges the caller to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOutcome {
    None,
    /// The round lost its quorum: end it immediately as a runner win.
    Forfeit,
    /// The sole chaser left an active round with ≥2 players remaining;
    /// a replacement must be promoted before the next broadcast.
    ChaserNeeded,
}

/// The authoritative session state — the single source of truth for who is
/// playing, who is chasing, and how much time is left.
///
/// All mutation goes through the methods below, and every method keeps
/// `player_count`/`tagger_count` in step with the map in the same step, so
/// the counters cannot drift from the records they summarize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Keyed by monotonically allocated ids, so iteration order is join
    /// order. Tie-breaks that say "first encountered" rely on this.
    pub players: BTreeMap<PlayerId, Player>,
    pub player_count: usize,
    pub tagger_count: usize,
    /// Seconds remaining in the active round.
    pub time_left: u32,
    pub phase: RoundPhase,
    pub round_ended: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            players: BTreeMap::new(),
            player_count: 0,
            tagger_count: 0,
            time_left: 0,
            phase: RoundPhase::WaitingForPlayers,
            round_ended: false,
        }
    }

    /// Register a new player as a runner at a random spawn point.
    /// Joining an active round grants the temporary shield; the in-progress
    /// round's timer and chaser are left untouched.
    pub fn add_player(&mut self, id: PlayerId, username: String, rng: &mut impl Rng) {
        let mut player = Player::new(id, username, arena::random_spawn_point(rng));
        if self.phase == RoundPhase::Active {
            player.is_shielded = true;
        }
        self.players.insert(id, player);
        self.player_count += 1;
    }

    /// Remove a player, keeping every counter and fairness rule intact.
    /// Unknown ids are a no-op. A lone survivor is demoted to runner —
    /// there is nobody left to tag.
    pub fn remove_player(&mut self, id: PlayerId) -> RemovalOutcome {
        let Some(removed) = self.players.remove(&id) else {
            return RemovalOutcome::None;
        };
        self.player_count -= 1;
        if removed.is_tagger {
            self.tagger_count -= 1;
        }

        if self.player_count == 1
            && let Some(last) = self.players.values_mut().next()
            && last.is_tagger
        {
            last.set_role(false);
            self.tagger_count -= 1;
        }

        if self.phase == RoundPhase::Active && !self.round_ended {
            if self.player_count < 2 {
                return RemovalOutcome::Forfeit;
            }
            if self.tagger_count == 0 {
                return RemovalOutcome::ChaserNeeded;
            }
        }
        RemovalOutcome::None
    }

    /// Apply a position update for `id`. Unknown ids are silently ignored.
    /// Returns whether anything changed.
    pub fn apply_move(
        &mut self,
        id: PlayerId,
        position: Vec3,
        rotation: f32,
        distance_delta: f32,
    ) -> bool {
        let Some(player) = self.players.get_mut(&id) else {
            return false;
        };
        player.position = position;
        player.rotation = rotation;
        player.distance_run += distance_delta.max(0.0);
        true
    }

    /// Drop a player's shield. Idempotent: expiring an already-bare player
    /// (or a departed one) changes nothing and reports false.
    pub fn clear_shield(&mut self, id: PlayerId) -> bool {
        match self.players.get_mut(&id) {
            Some(p) if p.is_shielded => {
                p.is_shielded = false;
                true
            },
            _ => false,
        }
    }

    /// Begin a round with a uniformly random chaser among current players.
    pub fn start_round(&mut self, rules: &GameRules, rng: &mut impl Rng) {
        let ids: Vec<PlayerId> = self.players.keys().copied().collect();
        if ids.is_empty() {
            return;
        }
        let chaser = ids[rng.random_range(0..ids.len())];
        self.start_round_with_chaser(rules, chaser);
    }

    /// Begin a round with a specific chaser: fresh timer, every other
    /// player a runner. The chaser id must belong to a current player.
    pub fn start_round_with_chaser(&mut self, rules: &GameRules, chaser: PlayerId) {
        for p in self.players.values_mut() {
            if p.is_tagger {
                p.set_role(false);
            }
        }
        self.tagger_count = 0;
        self.round_ended = false;
        self.time_left = rules.round_duration_secs;
        self.phase = RoundPhase::Active;
        if let Some(p) = self.players.get_mut(&chaser) {
            p.set_role(true);
            self.tagger_count = 1;
        } else {
            tracing::warn!(chaser, "Round started with unknown chaser id");
        }
    }

    /// Promote a uniformly random player to chaser. Used when a disconnect
    /// removes the only chaser from an active round.
    pub fn promote_random_chaser(&mut self, rng: &mut impl Rng) -> Option<PlayerId> {
        let ids: Vec<PlayerId> = self.players.keys().copied().collect();
        if ids.is_empty() {
            return None;
        }
        let id = ids[rng.random_range(0..ids.len())];
        if let Some(p) = self.players.get_mut(&id)
            && !p.is_tagger
        {
            p.set_role(true);
            self.tagger_count += 1;
        }
        Some(id)
    }

    /// Respawn every player as a fresh shielded runner: roles and scores
    /// cleared, distances zeroed, new spawn points. The post-round reset.
    pub fn reset_players(&mut self, rng: &mut impl Rng) {
        for p in self.players.values_mut() {
            p.set_role(false);
            p.is_shielded = true;
            p.score = 0;
            p.distance_run = 0.0;
            p.last_tag_time = 0;
            p.position = arena::random_spawn_point(rng);
        }
        self.tagger_count = 0;
    }

    /// Park the session until enough players are present again.
    pub fn wait_for_players(&mut self) {
        self.phase = RoundPhase::WaitingForPlayers;
        self.round_ended = false;
        self.time_left = 0;
    }

    /// Mark the round finished; the caller broadcasts the outcome and
    /// schedules the reset.
    pub fn begin_ending(&mut self) {
        self.round_ended = true;
        self.phase = RoundPhase::Ending;
    }

    /// One countdown second. Returns true exactly when the timer hits zero
    /// (the evasion-win condition).
    pub fn tick_second(&mut self) -> bool {
        if self.phase != RoundPhase::Active || self.round_ended {
            return false;
        }
        self.time_left = self.time_left.saturating_sub(1);
        self.time_left == 0
    }

    /// Players not currently chasing.
    pub fn runners_remaining(&self) -> usize {
        self.players.values().filter(|p| !p.is_tagger).count()
    }
}
