//! Subsystem operations.
//!
//! Each module takes `&mut CoreState` plus an explicit `now` and returns
//! results alongside the events to publish, in order. The facade owns
//! the lock and the bus; nothing here publishes directly.

pub mod agents;
pub mod messaging;
pub mod placements;
pub mod ritual;
pub mod sessions;
pub mod slots;
pub mod wayfinding;
pub mod world;

use serde_json::json;

use synthmob_types::event::names;
use synthmob_types::{CoreEvent, Millis, RitualPhase};

use crate::state::CoreState;

/// The composition: the 8-slot board, current placements, and the epoch.
pub fn composition_payload(state: &CoreState) -> serde_json::Value {
    json!({
        "slots": state.board.slots(),
        "placements": state.placements.snapshot(),
        "epoch": &state.epoch,
    })
}

pub fn composition_event(state: &CoreState) -> CoreEvent {
    CoreEvent::new(names::COMPOSITION, composition_payload(state))
}

/// The public context: epoch parameters plus a ritual phase hint when a
/// cycle is running.
pub fn context_payload(state: &CoreState, now: Millis) -> serde_json::Value {
    let mut payload = json!({
        "epoch": &state.epoch,
        "online_agents": state.agents.online_count(now),
    });
    if state.ritual.state.phase != RitualPhase::Idle {
        payload["ritual"] = json!({
            "phase": state.ritual.state.phase,
            "ritual_number": state.ritual.state.ritual_number,
            "phase_ends_at": state.ritual.state.phase_ends_at,
        });
    }
    payload
}

pub fn session_snapshot_event(state: &CoreState) -> CoreEvent {
    CoreEvent::new(
        names::SESSION_SNAPSHOT,
        json!({ "sessions": state.sessions.snapshot() }),
    )
}

/// Legacy alias snapshot: music-type sessions only.
pub fn jam_snapshot_event(state: &CoreState) -> CoreEvent {
    CoreEvent::new(
        names::JAM_SNAPSHOT,
        json!({ "sessions": state.sessions.music_snapshot() }),
    )
}

pub fn world_snapshot_event(state: &CoreState) -> CoreEvent {
    CoreEvent::new(
        names::WORLD_SNAPSHOT,
        serde_json::to_value(state.world.snapshot()).unwrap_or_else(|_| json!({})),
    )
}

pub fn placement_snapshot_event(state: &CoreState) -> CoreEvent {
    CoreEvent::new(
        names::MUSIC_PLACEMENT_SNAPSHOT,
        json!({ "placements": state.placements.snapshot() }),
    )
}
