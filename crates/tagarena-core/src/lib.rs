pub mod arena;
pub mod mvp;
pub mod net;
pub mod player;
pub mod rules;
pub mod session;
pub mod tagging;
pub mod time;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::rules::GameRules;
    use crate::session::SessionState;

    /// Rules with short timers so tests never wait on real durations.
    pub fn test_rules() -> GameRules {
        GameRules {
            round_duration_secs: 60,
            reset_delay_secs: 1,
            ..GameRules::default()
        }
    }

    /// A waiting session with `n` joined players, ids 1..=n in join order.
    pub fn make_session(n: usize) -> SessionState {
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = SessionState::new();
        for i in 1..=n as u64 {
            state.add_player(i, format!("Player{i}"), &mut rng);
        }
        state
    }
}
