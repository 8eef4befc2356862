//! Messaging and directive operations.

use serde_json::json;

use synthmob_types::event::names;
use synthmob_types::{
    Agent, AgentId, AgentMessage, CoreError, CoreEvent, Directive, Millis, SenderType,
};

use crate::state::CoreState;

/// Post an agent message (broadcast or targeted).
pub fn post_agent_message(
    state: &mut CoreState,
    from: &Agent,
    content: &str,
    to_agent_id: Option<AgentId>,
    now: Millis,
) -> (AgentMessage, Vec<CoreEvent>) {
    let message = state
        .messaging
        .add_agent_message(from, content, to_agent_id, now);
    let event = CoreEvent::new(
        names::AGENT_MESSAGE,
        serde_json::to_value(&message).unwrap_or_else(|_| json!({})),
    );
    (message, vec![event])
}

/// Post a human message (rate-limited per address hash).
pub fn post_human_message(
    state: &mut CoreState,
    sender_type: SenderType,
    from_name: &str,
    content: &str,
    ip_hash: u64,
    now: Millis,
) -> Result<(AgentMessage, Vec<CoreEvent>), CoreError> {
    let message = state
        .messaging
        .add_human_message(sender_type, from_name, content, ip_hash, now)?;
    let event = CoreEvent::new(
        names::AGENT_MESSAGE,
        serde_json::to_value(&message).unwrap_or_else(|_| json!({})),
    );
    Ok((message, vec![event]))
}

/// Append a paid directive for an agent.
pub fn add_directive(
    state: &mut CoreState,
    from_address: &str,
    to_agent_id: AgentId,
    content: &str,
    tx_hash: &str,
    now: Millis,
) -> Result<(Directive, Vec<CoreEvent>), CoreError> {
    let target = state
        .agents
        .by_id(&to_agent_id)
        .ok_or(CoreError::Unauthorized)?;
    let target_name = target.name.clone();
    let directive = state
        .messaging
        .add_directive(from_address, to_agent_id, content, tx_hash, now);
    // Announce creation without leaking the content to the stream.
    let event = CoreEvent::new(
        names::DIRECTIVE_CREATED,
        json!({
            "id": directive.id,
            "to": target_name,
            "created_at": directive.created_at,
        }),
    );
    Ok((directive, vec![event]))
}

/// Pending directives for an agent; flips them to delivered.
pub fn pending_directives(
    state: &mut CoreState,
    agent: &Agent,
    now: Millis,
) -> Vec<Directive> {
    state.messaging.take_pending(&agent.id, now)
}
