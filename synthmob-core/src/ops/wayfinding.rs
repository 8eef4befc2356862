//! Wayfinding operations: state reads, action submission, and the tick.

use synthmob_types::{ActionOutcome, Agent, CoreEvent, Millis, WayfindingAction, WayfindingEvent, WayfindingView};

use crate::state::CoreState;

fn to_core_event(event: &WayfindingEvent) -> CoreEvent {
    CoreEvent::new(
        &event.event_type,
        serde_json::to_value(event).unwrap_or_else(|_| serde_json::json!({})),
    )
}

/// Full state read for an agent, spawning it if absent.
pub fn get_state(state: &mut CoreState, agent: &Agent, now: Millis) -> WayfindingView {
    state.wayfinding.ensure(agent, now);
    state
        .wayfinding
        .view(&agent.id, now)
        .expect("nav ensured above")
}

/// Submit an action and return the outcome plus bus events.
pub fn submit_action(
    state: &mut CoreState,
    agent: &Agent,
    action: &WayfindingAction,
    now: Millis,
) -> (ActionOutcome, Vec<CoreEvent>) {
    state.wayfinding.ensure(agent, now);
    let (outcome, events) = state.wayfinding.submit(&agent.id, action, now);
    (outcome, events.iter().map(to_core_event).collect())
}

/// Finalize completed movements; returns the arrival events to publish.
pub fn tick(state: &mut CoreState, now: Millis) -> Vec<CoreEvent> {
    state
        .wayfinding
        .tick(now)
        .iter()
        .map(to_core_event)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::agents::register;

    #[test]
    fn submit_and_tick_produce_bus_events() {
        let mut state = CoreState::new(0, 600_000);
        let w = register(&mut state, "w", 0).unwrap();

        let (outcome, events) = submit_action(
            &mut state,
            &w,
            &WayfindingAction::MoveTo {
                x: 0.0,
                z: 0.0,
                reason: "regroup".into(),
            },
            0,
        );
        // Spawn is random; either the move was accepted (path event) or
        // we were already near the origin.
        if outcome.accepted {
            assert_eq!(events[0].name, "bot_nav_path_started");
            let completes = state
                .wayfinding
                .nav(&w.id)
                .unwrap()
                .movement_completes_at
                .unwrap();
            let arrivals = tick(&mut state, completes + 1);
            assert_eq!(arrivals.len(), 1);
            assert_eq!(arrivals[0].name, "bot_nav_arrived");
        } else {
            assert_eq!(
                outcome.reason_code.as_deref(),
                Some("already_at_destination")
            );
        }
    }

    #[test]
    fn get_state_spawns_and_lists_others() {
        let mut state = CoreState::new(0, 600_000);
        let a = register(&mut state, "a", 0).unwrap();
        let b = register(&mut state, "b", 0).unwrap();
        let view = get_state(&mut state, &a, 1);
        assert_eq!(view.self_view.bot_name, "a");
        assert_eq!(view.others.len(), 1);
        assert_eq!(view.others[0].bot_name, "b");
        let _ = b;
    }
}
