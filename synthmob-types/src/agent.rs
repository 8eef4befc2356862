//! Agent identity and presence.

use serde::{Deserialize, Serialize};

use crate::{AgentId, Millis, SessionId};

/// How long an agent counts as online after its last authenticated call (5 min).
pub const ONLINE_WINDOW_MS: Millis = 5 * 60 * 1000;

/// A registered agent. The token is the sole capability: whoever holds it
/// acts as this agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub token: String,
    pub created_at: Millis,
    pub total_placements: u32,
    pub reputation: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_address: Option<String>,
}

impl Agent {
    /// Redacted view safe to embed in events and snapshots.
    pub fn public(&self) -> AgentPublic {
        AgentPublic {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Public agent view; never carries the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPublic {
    pub id: AgentId,
    pub name: String,
}

/// Presence record, tracked separately from identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPresence {
    pub last_seen_at: Millis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_activity: Option<String>,
}

impl AgentPresence {
    pub fn is_online(&self, now: Millis) -> bool {
        now.saturating_sub(self.last_seen_at) < ONLINE_WINDOW_MS
    }
}

/// One entry of the online-agents listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineAgent {
    pub id: AgentId,
    pub name: String,
    pub last_seen_at: Millis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_activity: Option<String>,
    /// Slots on the board currently held by this agent.
    pub slots_held: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

/// Authenticated self-status snapshot. Cooldown fields are remaining
/// whole seconds, absent when the agent may write immediately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatus {
    pub id: AgentId,
    pub name: String,
    pub created_at: Millis,
    pub total_placements: u32,
    pub reputation: i32,
    pub online: bool,
    pub slots_held: Vec<u8>,
    pub placement_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_cooldown_remaining: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement_cooldown_remaining: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_activity: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn online_window() {
        let p = AgentPresence {
            last_seen_at: 1_000_000,
            current_activity: None,
        };
        assert!(p.is_online(1_000_000 + ONLINE_WINDOW_MS - 1));
        assert!(!p.is_online(1_000_000 + ONLINE_WINDOW_MS));
    }
}
