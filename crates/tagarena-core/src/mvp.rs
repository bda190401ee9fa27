use serde::{Deserialize, Serialize};

use crate::player::Player;

/// The standout player embedded in the round-over broadcast, normalized so
/// the broadcaster never needs to know which branch produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MvpRecord {
    pub username: String,
    /// Whole meters survived for a runner MVP, tag count for a chaser MVP.
    pub score: i64,
    pub is_runner: bool,
}

/// Pick the round MVP from the final player set.
///
/// If any runner is still standing (time-out or forfeit ending), the runner
/// with the strictly greatest distance covered wins; if everyone was
/// converted, the chaser with the strictly greatest tag count wins. Ties go
/// to the first player in iteration order — join order, since the session
/// map is keyed by monotonically allocated ids.
pub fn evaluate<'a, I>(players: I) -> Option<MvpRecord>
where
    I: IntoIterator<Item = &'a Player>,
{
    let mut best_runner: Option<&Player> = None;
    let mut best_chaser: Option<&Player> = None;
    for p in players {
        if p.is_tagger {
            if best_chaser.is_none_or(|b| p.score > b.score) {
                best_chaser = Some(p);
            }
        } else if best_runner.is_none_or(|b| p.distance_run > b.distance_run) {
            best_runner = Some(p);
        }
    }

    if let Some(r) = best_runner {
        return Some(MvpRecord {
            username: r.username.clone(),
            score: r.distance_run.floor() as i64,
            is_runner: true,
        });
    }
    best_chaser.map(|c| MvpRecord {
        username: c.username.clone(),
        score: i64::from(c.score),
        is_runner: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{Player, Vec3};

    fn player(id: u64, tagger: bool, score: u32, distance: f32) -> Player {
        let mut p = Player::new(id, format!("P{id}"), Vec3::default());
        p.is_tagger = tagger;
        p.score = score;
        p.distance_run = distance;
        p
    }

    #[test]
    fn empty_set_has_no_mvp() {
        let players: Vec<Player> = Vec::new();
        assert_eq!(evaluate(&players), None);
    }

    #[test]
    fn runner_mvp_by_distance() {
        let players = [
            player(1, true, 5, 0.0),
            player(2, false, 0, 12.9),
            player(3, false, 0, 40.2),
        ];
        let mvp = evaluate(players.iter()).unwrap();
        assert_eq!(mvp.username, "P3");
        assert_eq!(mvp.score, 40, "runner score is whole meters");
        assert!(mvp.is_runner);
    }

    #[test]
    fn runners_outrank_chasers_even_with_lower_numbers() {
        // A single surviving runner beats a chaser with any tag count.
        let players = [player(1, true, 99, 0.0), player(2, false, 0, 1.0)];
        let mvp = evaluate(players.iter()).unwrap();
        assert!(mvp.is_runner);
        assert_eq!(mvp.username, "P2");
    }

    #[test]
    fn chaser_mvp_when_no_runners_remain() {
        let players = [
            player(1, true, 1, 50.0),
            player(2, true, 3, 0.0),
            player(3, true, 2, 0.0),
        ];
        let mvp = evaluate(players.iter()).unwrap();
        assert_eq!(mvp.username, "P2");
        assert_eq!(mvp.score, 3);
        assert!(!mvp.is_runner);
    }

    #[test]
    fn ties_go_to_join_order() {
        let runners = [
            player(1, false, 0, 25.0),
            player(2, false, 0, 25.0),
        ];
        assert_eq!(evaluate(runners.iter()).unwrap().username, "P1");

        let chasers = [
            player(1, true, 4, 0.0),
            player(2, true, 4, 0.0),
        ];
        assert_eq!(evaluate(chasers.iter()).unwrap().username, "P1");
    }
}
