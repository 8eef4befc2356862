//! Session lifecycle operations and their event fanout.
//!
//! Every mutation publishes its specific `session_*` event followed by a
//! full `session_snapshot`. Music-type sessions additionally emit the
//! legacy `jam_*` aliases and a `jam_snapshot`.

use serde_json::json;

use synthmob_types::event::names;
use synthmob_types::{
    Agent, CoreError, CoreEvent, Millis, Session, SessionId, SessionType,
};

use crate::ops::{jam_snapshot_event, session_snapshot_event};
use crate::state::{CoreState, LeaveOutcome};
use crate::validate::{validate_output, OutputKind};

/// Structured session outputs are validated against their session type's
/// schema; music sessions carry patterns, not structured outputs.
fn check_output(
    session_type: SessionType,
    output: &Option<serde_json::Value>,
) -> Result<(), CoreError> {
    let Some(output) = output else { return Ok(()) };
    let kind = match session_type {
        SessionType::Music => return Ok(()),
        SessionType::Visual => OutputKind::Visual,
        SessionType::World => OutputKind::World,
        SessionType::Game => OutputKind::Game,
    };
    let validation = validate_output(kind, &output.to_string());
    if validation.accepted {
        Ok(())
    } else {
        Err(CoreError::ValidationFailed {
            details: validation.errors,
        })
    }
}

/// Push `session_<kind>` and, for music sessions, the `jam_<kind>` alias.
fn lifecycle_events(
    events: &mut Vec<CoreEvent>,
    kind: &str,
    session_type: SessionType,
    payload: serde_json::Value,
) {
    let session_name = match kind {
        "created" => names::SESSION_CREATED,
        "joined" => names::SESSION_JOINED,
        "left" => names::SESSION_LEFT,
        "ended" => names::SESSION_ENDED,
        _ => names::SESSION_OUTPUT_UPDATED,
    };
    events.push(CoreEvent::new(session_name, payload.clone()));
    if session_type == SessionType::Music {
        let jam_name = match kind {
            "created" => Some(names::JAM_CREATED),
            "joined" => Some(names::JAM_JOINED),
            "left" => Some(names::JAM_LEFT),
            "ended" => Some(names::JAM_ENDED),
            _ => None,
        };
        if let Some(name) = jam_name {
            events.push(CoreEvent::new(name, payload));
        }
    }
}

fn snapshots(state: &CoreState, session_type: SessionType, events: &mut Vec<CoreEvent>) {
    events.push(session_snapshot_event(state));
    if session_type == SessionType::Music {
        events.push(jam_snapshot_event(state));
    }
}

fn leave_events(state: &CoreState, agent: &Agent, outcome: &LeaveOutcome) -> Vec<CoreEvent> {
    let mut events = Vec::new();
    lifecycle_events(
        &mut events,
        "left",
        outcome.session_type,
        json!({
            "session_id": &outcome.session_id,
            "agent": agent.public(),
            "promoted": &outcome.promoted,
            "session": &outcome.session,
        }),
    );
    if outcome.ended {
        lifecycle_events(
            &mut events,
            "ended",
            outcome.session_type,
            json!({ "session_id": &outcome.session_id }),
        );
    }
    snapshots(state, outcome.session_type, &mut events);
    events
}

/// Start a session (or return the agent's current one unchanged).
#[derive(Debug)]
pub struct StartResult {
    pub session: Session,
    pub created: bool,
    pub events: Vec<CoreEvent>,
}

#[allow(clippy::too_many_arguments)]
pub fn start(
    state: &mut CoreState,
    agent: &Agent,
    session_type: SessionType,
    title: Option<String>,
    pattern: Option<String>,
    output: Option<serde_json::Value>,
    position: Option<(f64, f64)>,
    now: Millis,
) -> Result<StartResult, CoreError> {
    check_output(session_type, &output)?;
    let outcome = state
        .sessions
        .start(agent, session_type, title, pattern, output, position, now)?;
    let mut events = Vec::new();
    if outcome.created {
        lifecycle_events(
            &mut events,
            "created",
            outcome.session.session_type,
            json!({ "session": &outcome.session }),
        );
        snapshots(state, outcome.session.session_type, &mut events);
    }
    Ok(StartResult {
        session: outcome.session,
        created: outcome.created,
        events,
    })
}

/// Join a session, auto-leaving any previous one.
pub fn join(
    state: &mut CoreState,
    agent: &Agent,
    session_id: &SessionId,
    pattern: Option<String>,
    output: Option<serde_json::Value>,
    now: Millis,
) -> Result<(Session, Vec<CoreEvent>), CoreError> {
    let session_type = state
        .sessions
        .get(session_id)
        .ok_or(CoreError::SessionNotFound)?
        .session_type;
    check_output(session_type, &output)?;
    let outcome = state.sessions.join(agent, session_id, pattern, output, now)?;
    let mut events = Vec::new();
    if let Some(left) = &outcome.auto_left {
        events.extend(leave_events(state, agent, left));
    }
    lifecycle_events(
        &mut events,
        "joined",
        outcome.session.session_type,
        json!({ "session": &outcome.session, "agent": agent.public() }),
    );
    snapshots(state, outcome.session.session_type, &mut events);
    Ok((outcome.session, events))
}

/// Update the caller's contribution to a session.
pub fn update_output(
    state: &mut CoreState,
    agent: &Agent,
    session_id: &SessionId,
    pattern: Option<String>,
    output: Option<serde_json::Value>,
    now: Millis,
) -> Result<(Session, Vec<CoreEvent>), CoreError> {
    let session_type = state
        .sessions
        .get(session_id)
        .ok_or(CoreError::SessionNotFound)?
        .session_type;
    check_output(session_type, &output)?;
    let session = state
        .sessions
        .update_output(&agent.id, session_id, pattern, output, now)?;
    let mut events = Vec::new();
    lifecycle_events(
        &mut events,
        "output_updated",
        session.session_type,
        json!({ "session": &session, "agent": agent.public() }),
    );
    snapshots(state, session.session_type, &mut events);
    Ok((session, events))
}

/// Leave a session (the current one when no id is given).
pub fn leave(
    state: &mut CoreState,
    agent: &Agent,
    session_id: Option<&SessionId>,
    now: Millis,
) -> Result<(SessionId, Vec<CoreEvent>), CoreError> {
    let outcome = state.sessions.leave(&agent.id, session_id, now)?;
    let events = leave_events(state, agent, &outcome);
    Ok((outcome.session_id.clone(), events))
}
