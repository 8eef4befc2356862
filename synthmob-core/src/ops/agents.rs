//! Registration and status reads.

use synthmob_types::{Agent, AgentStatus, CoreError, Millis, OnlineAgent};

use crate::clock::secs_ceil;
use crate::state::CoreState;

/// Register a new agent and seed its wayfinding spawn.
pub fn register(state: &mut CoreState, name: &str, now: Millis) -> Result<Agent, CoreError> {
    let agent = state.agents.register(name, now)?;
    state.wayfinding.ensure(&agent, now);
    log::info!(target: "agents", "registered {} ({})", agent.name, agent.id);
    Ok(agent)
}

/// Authenticated self-status.
pub fn status(state: &CoreState, agent: &Agent, now: Millis) -> AgentStatus {
    let presence = state.agents.presence(&agent.id);
    AgentStatus {
        id: agent.id.clone(),
        name: agent.name.clone(),
        created_at: agent.created_at,
        total_placements: agent.total_placements,
        reputation: agent.reputation,
        online: presence.is_some_and(|p| p.is_online(now)),
        slots_held: state.board.slots_held_by(&agent.id),
        placement_count: state.placements.count_for(&agent.id),
        slot_cooldown_remaining: state
            .board
            .cooldown_remaining_ms(&agent.id, now)
            .map(secs_ceil),
        placement_cooldown_remaining: state
            .placements
            .cooldown_remaining_ms(&agent.id, now)
            .map(secs_ceil),
        session_id: state
            .sessions
            .session_of_agent(&agent.id)
            .map(|s| s.id.clone()),
        current_activity: presence.and_then(|p| p.current_activity.clone()),
    }
}

/// Agents seen within the online window.
pub fn online(state: &CoreState, now: Millis) -> Vec<OnlineAgent> {
    state
        .agents
        .online_ids(now)
        .into_iter()
        .filter_map(|id| {
            let agent = state.agents.by_id(&id)?;
            let presence = state.agents.presence(&id)?;
            Some(OnlineAgent {
                id: agent.id.clone(),
                name: agent.name.clone(),
                last_seen_at: presence.last_seen_at,
                current_activity: presence.current_activity.clone(),
                slots_held: state.board.slots_held_by(&id),
                session_id: state.sessions.session_of_agent(&id).map(|s| s.id.clone()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_seeds_wayfinding() {
        let mut state = CoreState::new(0, 600_000);
        let agent = register(&mut state, "alice", 0).unwrap();
        assert!(state.wayfinding.nav(&agent.id).is_some());
    }

    #[test]
    fn status_reflects_holdings() {
        let mut state = CoreState::new(0, 600_000);
        let agent = register(&mut state, "alice", 0).unwrap();
        state.board.write(2, "s(\"bd\")", &agent, 0).unwrap();

        let s = status(&state, &agent, 1_000);
        assert!(s.online);
        assert_eq!(s.slots_held, vec![2]);
        assert_eq!(s.placement_count, 0);
        assert_eq!(s.slot_cooldown_remaining, Some(59));
        assert!(s.placement_cooldown_remaining.is_none());
        assert!(s.session_id.is_none());
    }

    #[test]
    fn online_lists_only_recently_seen() {
        let mut state = CoreState::new(0, 600_000);
        register(&mut state, "old", 0).unwrap();
        register(&mut state, "fresh", 400_000).unwrap();
        let online_agents = online(&state, 400_001);
        assert_eq!(online_agents.len(), 1);
        assert_eq!(online_agents[0].name, "fresh");
    }
}
