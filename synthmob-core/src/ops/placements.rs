//! Music placement operations.

use synthmob_types::{
    Agent, CoreError, CoreEvent, InstrumentType, Millis, MusicPlacement, PlacementId, Position,
    Validation,
};

use crate::clock::secs_ceil;
use crate::ops::placement_snapshot_event;
use crate::state::CoreState;
use crate::validate::validate_pattern;

/// Place an instrument in the arena.
pub fn place(
    state: &mut CoreState,
    agent: &Agent,
    instrument_type: InstrumentType,
    pattern: &str,
    position: Position,
    now: Millis,
) -> Result<(MusicPlacement, Validation, Vec<CoreEvent>), CoreError> {
    if let Some(remaining) = state.placements.cooldown_remaining_ms(&agent.id, now) {
        return Err(CoreError::Cooldown {
            retry_after: secs_ceil(remaining),
        });
    }
    let validation = validate_pattern(pattern, None);
    if !validation.accepted {
        return Err(CoreError::ValidationFailed {
            details: validation.errors,
        });
    }

    let placement = state
        .placements
        .place(agent, instrument_type, pattern, position, now)?;
    Ok((
        placement,
        validation,
        vec![placement_snapshot_event(state)],
    ))
}

/// Update a placement's pattern (owner only).
pub fn update(
    state: &mut CoreState,
    agent: &Agent,
    placement_id: &PlacementId,
    pattern: &str,
    now: Millis,
) -> Result<(MusicPlacement, Validation, Vec<CoreEvent>), CoreError> {
    let validation = validate_pattern(pattern, None);
    if !validation.accepted {
        return Err(CoreError::ValidationFailed {
            details: validation.errors,
        });
    }
    let placement = state
        .placements
        .update(&agent.id, placement_id, pattern, now)?;
    Ok((
        placement,
        validation,
        vec![placement_snapshot_event(state)],
    ))
}

/// Remove a placement (owner only).
pub fn remove(
    state: &mut CoreState,
    agent: &Agent,
    placement_id: &PlacementId,
) -> Result<Vec<CoreEvent>, CoreError> {
    state.placements.remove(&agent.id, placement_id)?;
    Ok(vec![placement_snapshot_event(state)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::agents::register;

    fn origin() -> Position {
        Position { x: 0.0, z: 0.0 }
    }

    #[test]
    fn place_validates_then_stores() {
        let mut state = CoreState::new(0, 600_000);
        let m = register(&mut state, "m", 0).unwrap();

        let err = place(&mut state, &m, InstrumentType::Tr808, "nope", origin(), 0).unwrap_err();
        assert_eq!(err.code(), "validation_failed");
        assert!(state.placements.is_empty());

        let (placement, _, events) =
            place(&mut state, &m, InstrumentType::Tr808, "s(\"bd\")", origin(), 0).unwrap();
        assert_eq!(placement.bot_name, "m");
        assert_eq!(events[0].name, "music_placement_snapshot");
    }

    #[test]
    fn update_keeps_snapshot_events_flowing() {
        let mut state = CoreState::new(0, 600_000);
        let m = register(&mut state, "m", 0).unwrap();
        let (placement, ..) =
            place(&mut state, &m, InstrumentType::Synth, "s(\"bd\")", origin(), 0).unwrap();

        let (updated, _, events) =
            update(&mut state, &m, &placement.id, "s(\"sd\")", 20_000).unwrap();
        assert_eq!(updated.pattern, "s(\"sd\")");
        assert_eq!(events[0].name, "music_placement_snapshot");

        let events = remove(&mut state, &m, &placement.id).unwrap();
        assert_eq!(events[0].name, "music_placement_snapshot");
        assert!(state.placements.is_empty());
    }

    #[test]
    fn quota_error_surfaces_from_the_store() {
        let mut state = CoreState::new(0, 600_000);
        let m = register(&mut state, "m", 0).unwrap();
        for i in 0..5u64 {
            place(
                &mut state,
                &m,
                InstrumentType::Tr808,
                "s(\"bd\")",
                origin(),
                i * 20_000,
            )
            .unwrap();
        }
        let err = place(
            &mut state,
            &m,
            InstrumentType::Tr808,
            "s(\"bd\")",
            origin(),
            500_000,
        )
        .unwrap_err();
        assert_eq!(err, CoreError::MaxPlacementsReached);
    }
}
