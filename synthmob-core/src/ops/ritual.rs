//! Ritual phase machine and submissions.
//!
//! Transitions run on absolute deadlines from `tick`, so a late tick
//! merely delays a phase; nothing depends on tick cadence for
//! correctness. Every completed cycle applies a new epoch: the voted
//! winner per track, or a uniformly random value when a track got no
//! votes (kept identical to the original behavior even when candidates
//! exist; see DESIGN.md).

use rand::Rng;

use serde_json::json;

use synthmob_types::event::names;
use synthmob_types::music::{scale_notes, BPM_MAX, BPM_MIN};
use synthmob_types::{
    Agent, AgentId, CoreError, CoreEvent, EpochContext, Key, Millis, RitualPhase, RitualView,
    ScaleMode,
};

use crate::config::CoreConfig;
use crate::ops::composition_event;
use crate::state::CoreState;

fn random_parameters() -> (u16, Key, ScaleMode) {
    let mut rng = rand::thread_rng();
    let bpm = rng.gen_range(BPM_MIN..=BPM_MAX);
    let key = Key::ALL[rng.gen_range(0..Key::ALL.len())];
    let scale = ScaleMode::ALL[rng.gen_range(0..ScaleMode::ALL.len())];
    (bpm, key, scale)
}

/// Apply a new epoch and emit `epoch_changed` plus `composition`.
fn apply_new_epoch(
    state: &mut CoreState,
    bpm: u16,
    key: Key,
    scale: ScaleMode,
    now: Millis,
) -> Vec<CoreEvent> {
    let previous = state.epoch.clone();
    state.epoch = EpochContext {
        epoch: previous.epoch + 1,
        bpm,
        key,
        scale,
        scale_notes: scale_notes(key, scale),
        started_at: now,
    };
    log::info!(
        target: "ritual",
        "epoch {} applied: {} bpm, {} {}",
        state.epoch.epoch,
        bpm,
        key.name(),
        scale.name()
    );
    vec![
        CoreEvent::new(
            names::EPOCH_CHANGED,
            json!({
                "epoch": state.epoch.epoch,
                "bpm": state.epoch.bpm,
                "key": state.epoch.key,
                "scale": state.epoch.scale,
                "scale_notes": &state.epoch.scale_notes,
                "started_at": state.epoch.started_at,
                "previous_epoch": previous,
            }),
        ),
        composition_event(state),
    ]
}

/// Fizzle the current cycle: apply a random epoch and return to idle.
fn fizzle(state: &mut CoreState, now: Millis) -> Vec<CoreEvent> {
    let (bpm, key, scale) = random_parameters();
    let mut events = apply_new_epoch(state, bpm, key, scale, now);
    state.ritual.finish(now);
    events.push(CoreEvent::new(
        names::RITUAL_PHASE,
        json!({
            "phase": RitualPhase::Idle,
            "ritual_number": state.ritual.state.ritual_number,
            "fizzled": true,
            "randomized": { "bpm": bpm, "key": key, "scale": scale },
        }),
    ));
    events
}

/// Advance the phase machine. Called by the scheduler; idempotent when
/// nothing is due.
pub fn tick(state: &mut CoreState, cfg: &CoreConfig, now: Millis) -> Vec<CoreEvent> {
    match state.ritual.state.phase {
        RitualPhase::Idle => {
            if now < state.ritual.next_fire_at {
                return Vec::new();
            }
            state.ritual.next_fire_at = now + cfg.ritual_interval_ms;
            state.ritual.begin_cycle(now);
            if state.agents.online_count(now) == 0 {
                log::debug!(target: "ritual", "no agents online, fizzling");
                return fizzle(state, now);
            }
            let ends_at = now + cfg.nominate_duration_ms;
            let previous = state.epoch.clone();
            state.ritual.enter_nominate(now, ends_at, previous);
            vec![CoreEvent::new(
                names::RITUAL_PHASE,
                json!({
                    "phase": RitualPhase::Nominate,
                    "ritual_number": state.ritual.state.ritual_number,
                    "phase_ends_at": ends_at,
                }),
            )]
        }
        RitualPhase::Nominate => {
            if now < state.ritual.state.phase_ends_at {
                return Vec::new();
            }
            state.ritual.tally();
            if !state.ritual.has_candidates() {
                return fizzle(state, now);
            }
            let ends_at = now + cfg.vote_duration_ms;
            state.ritual.enter_vote(now, ends_at);
            let view = state.ritual.view(None, now);
            vec![CoreEvent::new(
                names::RITUAL_PHASE,
                json!({
                    "phase": RitualPhase::Vote,
                    "ritual_number": state.ritual.state.ritual_number,
                    "phase_ends_at": ends_at,
                    "bpm_candidates": view.bpm_candidates,
                    "key_candidates": view.key_candidates,
                }),
            )]
        }
        RitualPhase::Vote => {
            if now < state.ritual.state.phase_ends_at {
                return Vec::new();
            }
            // Both tracks always apply something: the vote winner, or a
            // fresh random value when the track got no votes.
            let (random_bpm, random_key, random_scale) = random_parameters();
            let bpm = state
                .ritual
                .bpm_vote_winner()
                .map(|c| c.bpm)
                .unwrap_or(random_bpm);
            let (key, scale) = state
                .ritual
                .key_vote_winner()
                .map(|c| (c.key, c.scale))
                .unwrap_or((random_key, random_scale));
            state.ritual.state.bpm_winner = Some(bpm);
            state.ritual.state.key_winner = Some((key, scale));

            let mut events = apply_new_epoch(state, bpm, key, scale, now);
            let ends_at = now + cfg.result_display_ms;
            state.ritual.enter_result(now, ends_at);
            events.push(CoreEvent::new(
                names::RITUAL_PHASE,
                json!({
                    "phase": RitualPhase::Result,
                    "ritual_number": state.ritual.state.ritual_number,
                    "phase_ends_at": ends_at,
                    "bpm_winner": bpm,
                    "key_winner": { "key": key, "scale": scale },
                }),
            ));
            events
        }
        RitualPhase::Result => {
            if now < state.ritual.state.phase_ends_at {
                return Vec::new();
            }
            state.ritual.finish(now);
            vec![CoreEvent::new(
                names::RITUAL_PHASE,
                json!({
                    "phase": RitualPhase::Idle,
                    "ritual_number": state.ritual.state.ritual_number,
                }),
            )]
        }
    }
}

/// Submit nominations. `key`/`scale` arrive as wire strings; the scale
/// defaults to pentatonic when a key is given alone.
pub fn nominate(
    state: &mut CoreState,
    agent: &Agent,
    bpm: Option<u16>,
    key: Option<&str>,
    scale: Option<&str>,
    reasoning: &str,
    now: Millis,
) -> Result<(RitualView, Vec<CoreEvent>), CoreError> {
    let key_pair = match key {
        Some(raw) => {
            let key = Key::parse(raw).ok_or_else(|| CoreError::ValidationFailed {
                details: vec![format!("unknown key {}", raw)],
            })?;
            let scale = match scale {
                Some(raw) => ScaleMode::parse(raw).ok_or_else(|| CoreError::ValidationFailed {
                    details: vec![format!("unknown scale {}", raw)],
                })?,
                None => ScaleMode::Pentatonic,
            };
            Some((key, scale))
        }
        None => None,
    };

    state.ritual.nominate(agent, bpm, key_pair, reasoning, now)?;
    let event = CoreEvent::new(
        names::RITUAL_NOMINATION,
        json!({
            "ritual_number": state.ritual.state.ritual_number,
            "nominated_by": &agent.name,
            "bpm": bpm,
            "key": key_pair.map(|(k, _)| k),
            "scale": key_pair.map(|(_, s)| s),
        }),
    );
    Ok((state.ritual.view(Some(&agent.id), now), vec![event]))
}

/// Submit votes by candidate index.
pub fn vote(
    state: &mut CoreState,
    agent: &Agent,
    bpm_index: Option<usize>,
    key_index: Option<usize>,
    now: Millis,
) -> Result<(RitualView, Vec<CoreEvent>), CoreError> {
    state.ritual.vote(agent, bpm_index, key_index, now)?;
    let event = CoreEvent::new(
        names::RITUAL_VOTE,
        json!({
            "ritual_number": state.ritual.state.ritual_number,
            "voter": &agent.name,
            "bpm_candidate_index": bpm_index,
            "key_candidate_index": key_index,
        }),
    );
    Ok((state.ritual.view(Some(&agent.id), now), vec![event]))
}

/// The ritual view for a (possibly anonymous) reader.
pub fn view(state: &CoreState, agent_id: Option<&AgentId>, now: Millis) -> RitualView {
    state.ritual.view(agent_id, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::agents::register;

    fn cfg() -> CoreConfig {
        CoreConfig {
            ritual_interval_ms: 600_000,
            nominate_duration_ms: 90_000,
            vote_duration_ms: 60_000,
            result_display_ms: 30_000,
            ..CoreConfig::default()
        }
    }

    #[test]
    fn fizzles_when_nobody_is_online() {
        let mut state = CoreState::new(0, 600_000);
        let events = tick(&mut state, &cfg(), 600_000);
        let names: Vec<&str> = events.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["epoch_changed", "composition", "ritual_phase"]);

        let phase = &events[2].payload;
        assert_eq!(phase["phase"], "idle");
        assert_eq!(phase["fizzled"], true);
        let bpm = phase["randomized"]["bpm"].as_u64().unwrap();
        assert!((60..=200).contains(&bpm));
        assert_eq!(state.epoch.epoch, 2);
        assert_eq!(state.ritual.state.phase, RitualPhase::Idle);
        // Next fire rescheduled a full interval out.
        assert_eq!(state.ritual.next_fire_at, 1_200_000);
    }

    #[test]
    fn full_cycle_with_one_voter_each_way() {
        let mut state = CoreState::new(0, 600_000);
        let a = register(&mut state, "a", 600_000).unwrap();
        let b = register(&mut state, "b", 600_000).unwrap();
        let cfg = cfg();

        // Interval fire with agents online: nominate.
        let events = tick(&mut state, &cfg, 600_000);
        assert_eq!(events[0].name, "ritual_phase");
        assert_eq!(events[0].payload["phase"], "nominate");
        assert_eq!(state.ritual.state.ritual_number, 1);

        nominate(&mut state, &a, Some(130), None, None, "slower", 600_500).unwrap();
        nominate(&mut state, &b, Some(140), None, None, "faster", 601_000).unwrap();

        // Nominate deadline: two BPM candidates, vote phase.
        let events = tick(&mut state, &cfg, 690_000);
        assert_eq!(events[0].payload["phase"], "vote");
        assert_eq!(
            events[0].payload["bpm_candidates"].as_array().unwrap().len(),
            2
        );

        // a votes for b's candidate (index 2), b for a's (index 1).
        vote(&mut state, &a, Some(2), None, 691_000).unwrap();
        vote(&mut state, &b, Some(1), None, 692_000).unwrap();

        // Vote deadline: tie at one vote each, lower index wins: 130.
        let events = tick(&mut state, &cfg, 750_000);
        let epoch_changed = events.iter().find(|e| e.name == "epoch_changed").unwrap();
        assert_eq!(epoch_changed.payload["bpm"], 130);
        assert_eq!(state.epoch.bpm, 130);
        assert_eq!(state.epoch.epoch, 2);
        let result = events.iter().find(|e| e.name == "ritual_phase").unwrap();
        assert_eq!(result.payload["phase"], "result");

        // Result display over: back to idle.
        let events = tick(&mut state, &cfg, 780_000);
        assert_eq!(events[0].payload["phase"], "idle");
        assert_eq!(state.ritual.state.phase, RitualPhase::Idle);
    }

    #[test]
    fn nominate_outside_phase_is_rejected() {
        let mut state = CoreState::new(0, 600_000);
        let a = register(&mut state, "a", 0).unwrap();
        assert_eq!(
            nominate(&mut state, &a, Some(130), None, None, "", 0).unwrap_err(),
            CoreError::NotInNominatePhase
        );
    }

    #[test]
    fn single_candidate_track_gets_empty_list_and_random_fallback() {
        let mut state = CoreState::new(0, 600_000);
        let a = register(&mut state, "a", 600_000).unwrap();
        let b = register(&mut state, "b", 600_000).unwrap();
        let cfg = cfg();
        tick(&mut state, &cfg, 600_000);

        // Only BPM qualifies (two unique values); the key track has one.
        nominate(&mut state, &a, Some(130), Some("D"), None, "", 600_100).unwrap();
        nominate(&mut state, &b, Some(140), None, None, "", 600_200).unwrap();

        let events = tick(&mut state, &cfg, 690_000);
        assert_eq!(events[0].payload["phase"], "vote");
        assert!(events[0].payload["key_candidates"].as_array().unwrap().is_empty());

        // Voting on the empty key track is rejected.
        assert_eq!(
            vote(&mut state, &a, None, Some(1), 691_000).unwrap_err(),
            CoreError::InvalidKeyCandidate
        );

        // No votes at all: both tracks resolve randomly but an epoch
        // still applies.
        let events = tick(&mut state, &cfg, 750_000);
        assert!(events.iter().any(|e| e.name == "epoch_changed"));
        assert_eq!(state.epoch.epoch, 2);
    }

    #[test]
    fn fizzles_when_no_track_qualifies() {
        let mut state = CoreState::new(0, 600_000);
        let a = register(&mut state, "a", 600_000).unwrap();
        let cfg = cfg();
        tick(&mut state, &cfg, 600_000);
        nominate(&mut state, &a, Some(130), None, None, "", 600_100).unwrap();

        let events = tick(&mut state, &cfg, 690_000);
        let phase = events.iter().find(|e| e.name == "ritual_phase").unwrap();
        assert_eq!(phase.payload["fizzled"], true);
        assert_eq!(state.ritual.state.phase, RitualPhase::Idle);
    }

    #[test]
    fn scale_defaults_to_pentatonic() {
        let mut state = CoreState::new(0, 600_000);
        let a = register(&mut state, "a", 600_000).unwrap();
        let b = register(&mut state, "b", 600_000).unwrap();
        let cfg = cfg();
        tick(&mut state, &cfg, 600_000);
        nominate(&mut state, &a, None, Some("D"), None, "", 600_100).unwrap();
        nominate(&mut state, &b, None, Some("E"), Some("minor"), "", 600_200).unwrap();
        assert_eq!(state.ritual.state.key_nominations[0].scale, ScaleMode::Pentatonic);
        assert_eq!(state.ritual.state.key_nominations[1].scale, ScaleMode::Minor);
    }
}
