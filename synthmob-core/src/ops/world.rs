//! World store operations.

use synthmob_types::{Agent, AgentId, CoreError, CoreEvent, Millis, Validation, WorldSnapshot};

use crate::ops::world_snapshot_event;
use crate::state::CoreState;
use crate::validate::{validate_output, OutputKind};

/// Write an agent's world output. Validated against the world schema
/// before anything mutates.
pub fn write(
    state: &mut CoreState,
    agent: &Agent,
    output_json: &str,
    now: Millis,
) -> Result<(WorldSnapshot, Validation, Vec<CoreEvent>), CoreError> {
    let validation = validate_output(OutputKind::World, output_json);
    if !validation.accepted {
        return Err(CoreError::ValidationFailed {
            details: validation.errors,
        });
    }
    let output: serde_json::Value = serde_json::from_str(output_json)
        .map_err(|e| CoreError::InvalidJson(e.to_string()))?;

    state.world.write(agent, output, now);
    Ok((
        state.world.snapshot(),
        validation,
        vec![world_snapshot_event(state)],
    ))
}

/// Drop an agent's contribution and rebuild the environment.
pub fn clear(
    state: &mut CoreState,
    agent_id: &AgentId,
    now: Millis,
) -> (WorldSnapshot, Vec<CoreEvent>) {
    let removed = state.world.clear_agent(agent_id, now);
    let events = if removed {
        vec![world_snapshot_event(state)]
    } else {
        Vec::new()
    };
    (state.world.snapshot(), events)
}
