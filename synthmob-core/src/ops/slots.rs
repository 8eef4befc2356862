//! Slot board writes.

use serde_json::json;

use synthmob_types::event::names;
use synthmob_types::{Agent, CoreError, CoreEvent, Millis, Slot, Validation};

use crate::clock::secs_ceil;
use crate::state::CoreState;
use crate::validate::validate_pattern;

/// Write a slot: cooldown, then validation, then the overwrite. Returns
/// the updated slot, validator warnings, and the events to publish.
pub fn write_slot(
    state: &mut CoreState,
    agent: &Agent,
    slot_id: u8,
    code: &str,
    now: Millis,
) -> Result<(Slot, Validation, Vec<CoreEvent>), CoreError> {
    if code.trim().is_empty() {
        return Err(CoreError::CodeRequired);
    }
    let slot_type = state
        .board
        .slot(slot_id)
        .ok_or(CoreError::InvalidSlot)?
        .slot_type;
    if let Some(remaining) = state.board.cooldown_remaining_ms(&agent.id, now) {
        return Err(CoreError::Cooldown {
            retry_after: secs_ceil(remaining),
        });
    }

    let validation = validate_pattern(code, Some(slot_type));
    if !validation.accepted {
        return Err(CoreError::ValidationFailed {
            details: validation.errors,
        });
    }

    let write = state.board.write(slot_id, code, agent, now)?;
    state.agents.bump_placements(&agent.id);

    let event = CoreEvent::new(
        names::SLOT_UPDATE,
        json!({
            "slot": write.slot.id,
            "slot_type": write.slot.slot_type,
            "label": &write.slot.label,
            "code": &write.slot.code,
            "agent": &write.slot.agent,
            "previous_agent": &write.previous_agent,
            "updated_at": write.slot.updated_at,
            "warnings": &validation.warnings,
        }),
    );
    Ok((write.slot, validation, vec![event]))
}
