use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, Instant, MissedTickBehavior};

use tagarena_core::mvp;
use tagarena_core::net::messages::{GameOverMsg, GameStateMsg, ServerMessage, TaggedMsg};
use tagarena_core::net::protocol::encode_server_message;
use tagarena_core::player::{PlayerId, Vec3};
use tagarena_core::rules::GameRules;
use tagarena_core::session::{RemovalOutcome, RoundPhase, SessionState};
use tagarena_core::tagging;
use tagarena_core::time::epoch_millis;

use crate::config::ServerConfig;

/// Per-player sender for outbound WebSocket frames. Bounded so one slow
/// client cannot buffer the whole session into memory exhaustion; `Bytes`
/// keeps fan-out clones zero-copy.
pub type PlayerSender = mpsc::Sender<Bytes>;

/// Commands serialized into the session loop. Every session mutation runs
/// on the loop task in arrival order; WebSocket handlers and timers only
/// enqueue.
#[derive(Debug)]
pub enum SessionCommand {
    Join {
        id: PlayerId,
        username: String,
        sender: PlayerSender,
    },
    Move {
        id: PlayerId,
        position: Vec3,
        rotation: f32,
        distance_delta: f32,
    },
    TagAttempt {
        id: PlayerId,
    },
    ShieldExpired {
        id: PlayerId,
    },
    Leave {
        id: PlayerId,
    },
    Snapshot {
        reply: oneshot::Sender<SessionState>,
    },
    Stop,
}

/// Which side a finished round went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoundOutcome {
    /// Timer expiry or forfeit.
    RunnersWin,
    /// Every runner converted.
    ChasersWin,
}

/// Spawn the single-writer session loop. The returned sender is the only
/// way to touch session state.
pub fn spawn_session_loop(config: Arc<ServerConfig>) -> mpsc::UnboundedSender<SessionCommand> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run_session_loop(config, rx));
    tx
}

async fn run_session_loop(
    config: Arc<ServerConfig>,
    mut cmd_rx: mpsc::UnboundedReceiver<SessionCommand>,
) {
    let mut session = SessionLoop::new(config.game.clone());

    let mut tick = tokio::time::interval(Duration::from_secs(1));
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tick.tick() => session.handle_tick(),
            _ = sleep_until_or_never(session.pending_reset) => session.finish_reset(),
            cmd = cmd_rx.recv() => match cmd {
                Some(SessionCommand::Stop) | None => break,
                Some(cmd) => session.handle_command(cmd),
            },
        }
    }
    tracing::info!("Session loop stopped");
}

/// Sleep until the deadline, or forever when there is none. Rebuilt on
/// every select iteration, so replacing the deadline reschedules cleanly.
async fn sleep_until_or_never(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

struct SessionLoop {
    state: SessionState,
    rules: GameRules,
    senders: HashMap<PlayerId, PlayerSender>,
    /// Deadline of the pending post-round reset. Replaced whenever a round
    /// ends and cleared when the reset fires, so rapid join/leave churn can
    /// never leave a stale timer mutating a future round.
    pending_reset: Option<Instant>,
}

impl SessionLoop {
    fn new(rules: GameRules) -> Self {
        Self {
            state: SessionState::new(),
            rules,
            senders: HashMap::new(),
            pending_reset: None,
        }
    }

    fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Join {
                id,
                username,
                sender,
            } => self.handle_join(id, username, sender),
            SessionCommand::Move {
                id,
                position,
                rotation,
                distance_delta,
            } => self.handle_move(id, position, rotation, distance_delta),
            SessionCommand::TagAttempt { id } => {
                if self.resolve_tags(id) {
                    self.broadcast_state();
                }
            },
            SessionCommand::ShieldExpired { id } => {
                // Idempotent: repeat expiries and departed players change nothing.
                if self.state.clear_shield(id) {
                    self.broadcast_state();
                }
            },
            SessionCommand::Leave { id } => self.handle_leave(id),
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.state.clone());
            },
            // Stop is matched by the loop itself before dispatch.
            SessionCommand::Stop => {},
        }
    }

    fn handle_join(&mut self, id: PlayerId, username: String, sender: PlayerSender) {
        self.senders.insert(id, sender);
        self.state.add_player(id, username, &mut rand::rng());
        tracing::info!(player_id = id, players = self.state.player_count, "Player joined");

        // The join that establishes quorum starts the first round. Joins
        // into a running round never restart the timer or re-roll roles.
        if self.state.player_count >= 2 && self.state.phase == RoundPhase::WaitingForPlayers {
            self.state.start_round(&self.rules, &mut rand::rng());
            tracing::info!(
                time_left = self.state.time_left,
                "Round started"
            );
        }
        self.broadcast_state();
    }

    fn handle_move(
        &mut self,
        id: PlayerId,
        position: Vec3,
        rotation: f32,
        distance_delta: f32,
    ) {
        if !self.state.apply_move(id, position, rotation, distance_delta) {
            return;
        }
        // Reactive tag path: moving as a chaser resolves tags under exactly
        // the same radius/cooldown/shield rules as an explicit attempt.
        self.resolve_tags(id);
        self.broadcast_state();
    }

    fn handle_leave(&mut self, id: PlayerId) {
        self.senders.remove(&id);
        match self.state.remove_player(id) {
            RemovalOutcome::None => {},
            RemovalOutcome::Forfeit => {
                tracing::info!(player_id = id, "Quorum lost, runners win by forfeit");
                self.end_round(RoundOutcome::RunnersWin);
            },
            RemovalOutcome::ChaserNeeded => {
                // The sole chaser dropped mid-round; promote a replacement
                // before anyone can observe a chaserless active round.
                if let Some(promoted) = self.state.promote_random_chaser(&mut rand::rng()) {
                    tracing::info!(player_id = promoted, "Promoted replacement chaser");
                }
            },
        }
        tracing::info!(player_id = id, players = self.state.player_count, "Player left");
        self.broadcast_state();
    }

    /// Run the shared tag resolution for `id`. Returns whether any state
    /// changed. Emits one Tagged broadcast per conversion and ends the
    /// round when the last runner falls.
    fn resolve_tags(&mut self, id: PlayerId) -> bool {
        if self.state.phase != RoundPhase::Active || self.state.round_ended {
            return false;
        }
        let events = tagging::attempt_tag(&mut self.state, &self.rules, id, epoch_millis());
        if events.is_empty() {
            return false;
        }
        let ended = events.last().is_some_and(|e| e.is_last_tag);
        for event in events {
            tracing::info!(
                target = event.id,
                tagger = event.tagger_id,
                is_last_tag = event.is_last_tag,
                "Player tagged"
            );
            self.broadcast(&ServerMessage::Tagged(TaggedMsg::from(event)));
        }
        if ended {
            self.end_round(RoundOutcome::ChasersWin);
        }
        true
    }

    /// Broadcast the outcome and arm the reset delay. The MVP is computed
    /// before any reset touches scores or distances.
    fn end_round(&mut self, outcome: RoundOutcome) {
        if self.state.round_ended {
            return;
        }
        let mvp = mvp::evaluate(self.state.players.values());
        self.state.begin_ending();
        let runners_won = outcome == RoundOutcome::RunnersWin;
        self.broadcast(&ServerMessage::GameOver(GameOverMsg { runners_won, mvp }));
        self.pending_reset =
            Some(Instant::now() + Duration::from_secs(self.rules.reset_delay_secs));
        tracing::info!(runners_won, "Round over");
    }

    /// The post-round reset: respawn everyone, then either start the next
    /// round or park the session until quorum returns.
    fn finish_reset(&mut self) {
        self.pending_reset = None;
        self.state.phase = RoundPhase::Resetting;
        self.state.reset_players(&mut rand::rng());
        if self.state.player_count >= 2 {
            self.state.start_round(&self.rules, &mut rand::rng());
            tracing::info!(players = self.state.player_count, "New round started");
        } else {
            self.state.wait_for_players();
        }
        self.broadcast_state();
    }

    /// One countdown second. Keeps clients synchronized even when nobody
    /// moves; reaching zero is the evasion win.
    fn handle_tick(&mut self) {
        if self.state.phase != RoundPhase::Active {
            return;
        }
        if self.state.tick_second() {
            tracing::info!("Time expired, runners win");
            self.end_round(RoundOutcome::RunnersWin);
        }
        self.broadcast_state();
    }

    fn broadcast_state(&self) {
        self.broadcast(&ServerMessage::GameState(Box::new(GameStateMsg {
            state: self.state.clone(),
        })));
    }

    fn broadcast(&self, msg: &ServerMessage) {
        match encode_server_message(msg) {
            Ok(data) => {
                let bytes = Bytes::from(data);
                for (&player_id, sender) in &self.senders {
                    if sender.try_send(bytes.clone()).is_err() {
                        tracing::debug!(
                            player_id,
                            "Skipping broadcast to slow client (channel full or closed)"
                        );
                    }
                }
            },
            Err(e) => tracing::error!(error = %e, "Failed to encode broadcast"),
        }
    }
}
