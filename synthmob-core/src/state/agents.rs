//! Agent registry: identity, capability tokens, presence.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use synthmob_types::{Agent, AgentId, AgentPresence, CoreError, Millis};

use crate::ids;

fn name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9._-]{1,20}$").unwrap())
}

/// Identity store. `(name -> id)` and `(token -> id)` are injective.
pub struct AgentRegistry {
    agents: HashMap<AgentId, Agent>,
    by_name: HashMap<String, AgentId>,
    by_token: HashMap<String, AgentId>,
    presence: HashMap<AgentId, AgentPresence>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: HashMap::new(),
            by_name: HashMap::new(),
            by_token: HashMap::new(),
            presence: HashMap::new(),
        }
    }

    /// Register a new agent. The caller seeds the wayfinding spawn.
    pub fn register(&mut self, name: &str, now: Millis) -> Result<Agent, CoreError> {
        if name.is_empty() {
            return Err(CoreError::NameRequired);
        }
        if !name_re().is_match(name) {
            return Err(CoreError::InvalidName);
        }
        if self.by_name.contains_key(name) {
            return Err(CoreError::NameTaken);
        }

        let agent = Agent {
            id: ids::new_agent_id(),
            name: name.to_string(),
            token: ids::new_token(),
            created_at: now,
            total_placements: 0,
            reputation: 0,
            owner_address: None,
        };
        self.by_name.insert(agent.name.clone(), agent.id.clone());
        self.by_token.insert(agent.token.clone(), agent.id.clone());
        self.presence.insert(
            agent.id.clone(),
            AgentPresence {
                last_seen_at: now,
                current_activity: None,
            },
        );
        self.agents.insert(agent.id.clone(), agent.clone());
        Ok(agent)
    }

    pub fn by_token(&self, token: &str) -> Option<&Agent> {
        self.by_token.get(token).and_then(|id| self.agents.get(id))
    }

    pub fn by_name(&self, name: &str) -> Option<&Agent> {
        self.by_name.get(name).and_then(|id| self.agents.get(id))
    }

    pub fn by_id(&self, id: &AgentId) -> Option<&Agent> {
        self.agents.get(id)
    }

    /// Refresh presence. Called on every authenticated operation.
    pub fn touch(&mut self, id: &AgentId, now: Millis, activity: Option<&str>) {
        let entry = self.presence.entry(id.clone()).or_insert(AgentPresence {
            last_seen_at: now,
            current_activity: None,
        });
        entry.last_seen_at = now;
        if let Some(activity) = activity {
            entry.current_activity = Some(activity.to_string());
        }
    }

    pub fn presence(&self, id: &AgentId) -> Option<&AgentPresence> {
        self.presence.get(id)
    }

    /// Ids of agents seen within the online window, sorted by name for
    /// stable output.
    pub fn online_ids(&self, now: Millis) -> Vec<AgentId> {
        let mut online: Vec<&Agent> = self
            .agents
            .values()
            .filter(|a| {
                self.presence
                    .get(&a.id)
                    .is_some_and(|p| p.is_online(now))
            })
            .collect();
        online.sort_by(|a, b| a.name.cmp(&b.name));
        online.into_iter().map(|a| a.id.clone()).collect()
    }

    pub fn online_count(&self, now: Millis) -> usize {
        self.online_ids(now).len()
    }

    pub fn bump_placements(&mut self, id: &AgentId) {
        if let Some(agent) = self.agents.get_mut(id) {
            agent.total_placements += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn clear(&mut self) {
        self.agents.clear();
        self.by_name.clear();
        self.by_token.clear();
        self.presence.clear();
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup() {
        let mut reg = AgentRegistry::new();
        let agent = reg.register("alice", 1000).unwrap();
        assert_eq!(agent.name, "alice");
        assert_eq!(agent.token.len(), 64);
        assert_eq!(reg.by_token(&agent.token).unwrap().id, agent.id);
        assert_eq!(reg.by_name("alice").unwrap().id, agent.id);
    }

    #[test]
    fn name_rules() {
        let mut reg = AgentRegistry::new();
        assert_eq!(reg.register("", 0), Err(CoreError::NameRequired));
        assert_eq!(reg.register("has space", 0), Err(CoreError::InvalidName));
        assert_eq!(
            reg.register("way-too-long-for-the-rule", 0),
            Err(CoreError::InvalidName)
        );
        assert!(reg.register("ok.name_1-x", 0).is_ok());
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut reg = AgentRegistry::new();
        reg.register("alice", 0).unwrap();
        assert_eq!(reg.register("alice", 0), Err(CoreError::NameTaken));
    }

    #[test]
    fn online_window_tracks_touch() {
        let mut reg = AgentRegistry::new();
        let a = reg.register("a", 0).unwrap();
        assert_eq!(reg.online_count(1000), 1);
        assert_eq!(reg.online_count(300_000), 0);
        reg.touch(&a.id, 300_000, Some("writing slot 1"));
        assert_eq!(reg.online_count(300_001), 1);
        assert_eq!(
            reg.presence(&a.id).unwrap().current_activity.as_deref(),
            Some("writing slot 1")
        );
    }
}
