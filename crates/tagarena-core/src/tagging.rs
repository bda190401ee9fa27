use serde::{Deserialize, Serialize};

use crate::player::{PlayerId, Vec3};
use crate::rules::GameRules;
use crate::session::SessionState;

/// A successful tag, broadcast to clients one per converted target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagEvent {
    /// The player that was caught.
    pub id: PlayerId,
    pub tagger_id: PlayerId,
    /// Where the target stood when caught.
    pub position: Vec3,
    /// Set on the event that converted the final runner.
    pub is_last_tag: bool,
}

/// The single authoritative proximity test. Both tag paths — the reactive
/// check on every chaser move and the explicit tag-attempt message — go
/// through here, so radius semantics cannot diverge between them.
pub fn within_tag_radius(a: Vec3, b: Vec3, radius: f32) -> bool {
    a.planar_distance(&b) < radius
}

/// Resolve a tag attempt by `tagger_id` at wall-clock `now_ms`.
///
/// Silent no-op (empty result) when the actor is unknown, is not a chaser,
/// or is still inside the cooldown window from their previous tag. Every
/// unshielded runner inside the radius converts in the same attempt; the
/// cooldown stamp is written only when at least one tag lands.
pub fn attempt_tag(
    state: &mut SessionState,
    rules: &GameRules,
    tagger_id: PlayerId,
    now_ms: u64,
) -> Vec<TagEvent> {
    let Some(tagger) = state.players.get(&tagger_id) else {
        return Vec::new();
    };
    if !tagger.is_tagger {
        return Vec::new();
    }
    if tagger.last_tag_time != 0
        && now_ms.saturating_sub(tagger.last_tag_time) < rules.tag_cooldown_ms
    {
        return Vec::new();
    }
    let tagger_pos = tagger.position;

    // Shields gate being tagged, never tagging: a shielded chaser still
    // converts everyone in range.
    let targets: Vec<PlayerId> = state
        .players
        .values()
        .filter(|p| {
            p.id != tagger_id
                && !p.is_tagger
                && !p.is_shielded
                && within_tag_radius(tagger_pos, p.position, rules.tag_radius)
        })
        .map(|p| p.id)
        .collect();
    if targets.is_empty() {
        return Vec::new();
    }

    let mut events = Vec::with_capacity(targets.len());
    for id in targets {
        let Some(target) = state.players.get_mut(&id) else {
            continue;
        };
        target.set_role(true);
        target.last_tag_time = now_ms;
        let position = target.position;
        state.tagger_count += 1;
        events.push(TagEvent {
            id,
            tagger_id,
            position,
            is_last_tag: false,
        });
    }

    if let Some(tagger) = state.players.get_mut(&tagger_id) {
        tagger.score += events.len() as u32;
        tagger.last_tag_time = now_ms;
    }

    if state.runners_remaining() == 0
        && let Some(last) = events.last_mut()
    {
        last.is_last_tag = true;
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::Vec3;
    use crate::test_helpers::{make_session, test_rules};

    const NOW: u64 = 1_000_000;

    /// 3 players at known positions, player 1 chasing.
    fn chase_setup() -> SessionState {
        let mut s = make_session(3);
        s.start_round_with_chaser(&test_rules(), 1);
        s.players.get_mut(&1).unwrap().position = Vec3::new(0.0, 1.0, 0.0);
        s.players.get_mut(&2).unwrap().position = Vec3::new(1.0, 1.0, 0.0);
        s.players.get_mut(&3).unwrap().position = Vec3::new(0.0, 1.0, 100.0);
        s
    }

    #[test]
    fn radius_is_strict() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        assert!(within_tag_radius(a, Vec3::new(2.4, 0.0, 0.0), 2.5));
        assert!(!within_tag_radius(a, Vec3::new(2.5, 0.0, 0.0), 2.5));
        // Height never matters.
        assert!(within_tag_radius(a, Vec3::new(0.0, 50.0, 1.0), 2.5));
    }

    #[test]
    fn tag_converts_target_in_range() {
        let mut s = chase_setup();
        let events = attempt_tag(&mut s, &test_rules(), 1, NOW);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, 2);
        assert_eq!(events[0].tagger_id, 1);
        assert!(!events[0].is_last_tag, "player 3 is still a runner");
        assert!(s.players[&2].is_tagger);
        assert_eq!(s.players[&2].last_tag_time, NOW);
        assert_eq!(s.players[&1].score, 1);
        assert_eq!(s.players[&1].last_tag_time, NOW);
        assert_eq!(s.tagger_count, 2);
    }

    #[test]
    fn non_chaser_attempt_is_noop() {
        let mut s = chase_setup();
        let before = s.clone();
        let events = attempt_tag(&mut s, &test_rules(), 2, NOW);
        assert!(events.is_empty());
        assert_eq!(s, before);
    }

    #[test]
    fn unknown_actor_is_noop() {
        let mut s = chase_setup();
        assert!(attempt_tag(&mut s, &test_rules(), 99, NOW).is_empty());
    }

    #[test]
    fn out_of_radius_mutates_nothing() {
        let mut s = chase_setup();
        s.players.get_mut(&2).unwrap().position = Vec3::new(50.0, 1.0, 0.0);
        let before = s.clone();
        let events = attempt_tag(&mut s, &test_rules(), 1, NOW);
        assert!(events.is_empty());
        assert_eq!(s, before, "a missed attempt must not touch any state");
    }

    #[test]
    fn shield_blocks_being_tagged() {
        let mut s = chase_setup();
        s.players.get_mut(&2).unwrap().is_shielded = true;
        let events = attempt_tag(&mut s, &test_rules(), 1, NOW);
        assert!(events.is_empty());
        assert!(!s.players[&2].is_tagger);
    }

    #[test]
    fn shielded_chaser_can_still_tag() {
        let mut s = chase_setup();
        s.players.get_mut(&1).unwrap().is_shielded = true;
        let events = attempt_tag(&mut s, &test_rules(), 1, NOW);
        assert_eq!(events.len(), 1);
        assert!(s.players[&2].is_tagger);
    }

    #[test]
    fn cooldown_blocks_repeat_tags() {
        let rules = test_rules();
        let mut s = chase_setup();
        assert_eq!(attempt_tag(&mut s, &rules, 1, NOW).len(), 1);

        // Within the window: nothing happens even with a runner in range.
        s.players.get_mut(&3).unwrap().position = Vec3::new(1.0, 1.0, 0.0);
        let within = NOW + rules.tag_cooldown_ms - 1;
        assert!(attempt_tag(&mut s, &rules, 1, within).is_empty());
        assert!(!s.players[&3].is_tagger);

        // At the boundary the window has elapsed.
        let after = NOW + rules.tag_cooldown_ms;
        assert_eq!(attempt_tag(&mut s, &rules, 1, after).len(), 1);
        assert!(s.players[&3].is_tagger);
    }

    #[test]
    fn missed_attempt_does_not_stamp_cooldown() {
        let rules = test_rules();
        let mut s = chase_setup();
        s.players.get_mut(&2).unwrap().position = Vec3::new(50.0, 1.0, 0.0);
        attempt_tag(&mut s, &rules, 1, NOW);
        assert_eq!(s.players[&1].last_tag_time, 0);

        // A hit immediately afterwards still lands.
        s.players.get_mut(&2).unwrap().position = Vec3::new(1.0, 1.0, 0.0);
        assert_eq!(attempt_tag(&mut s, &rules, 1, NOW + 1).len(), 1);
    }

    #[test]
    fn simultaneous_targets_all_convert_and_last_is_flagged() {
        let mut s = chase_setup();
        // Both runners inside the radius.
        s.players.get_mut(&3).unwrap().position = Vec3::new(0.0, 1.0, 1.0);

        let events = attempt_tag(&mut s, &test_rules(), 1, NOW);
        assert_eq!(events.len(), 2);
        assert!(!events[0].is_last_tag);
        assert!(events[1].is_last_tag, "the final conversion carries the flag");
        assert_eq!(s.players[&1].score, 2);
        assert_eq!(s.runners_remaining(), 0);
        assert_eq!(s.tagger_count, 3);
    }
}
