//! Shared world store: per-agent contributions and the merged
//! environment.

use std::collections::BTreeMap;

use serde_json::Value;

use synthmob_types::world::ENVIRONMENT_KEYS;
use synthmob_types::{Agent, AgentId, ContributionView, Millis, WorldContribution, WorldSnapshot};

struct Entry {
    agent_id: AgentId,
    bot_name: String,
    contribution: WorldContribution,
}

/// World contributions keyed by agent, plus the process-wide environment
/// map. Environment fields resolve last-write-wins across all agents.
pub struct WorldStore {
    entries: Vec<Entry>,
    environment: BTreeMap<String, Value>,
    updated_at: Millis,
}

impl WorldStore {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            environment: BTreeMap::new(),
            updated_at: 0,
        }
    }

    /// Store an agent's output. Environment keys present in the output
    /// overwrite the shared map; the full output replaces the agent's
    /// previous contribution.
    pub fn write(&mut self, agent: &Agent, output: Value, now: Millis) {
        if let Some(obj) = output.as_object() {
            for key in ENVIRONMENT_KEYS {
                if let Some(value) = obj.get(key) {
                    self.environment.insert(key.to_string(), value.clone());
                }
            }
        }

        match self.entries.iter_mut().find(|e| e.agent_id == agent.id) {
            Some(entry) => {
                entry.contribution = WorldContribution {
                    output,
                    updated_at: now,
                };
            }
            None => self.entries.push(Entry {
                agent_id: agent.id.clone(),
                bot_name: agent.name.clone(),
                contribution: WorldContribution {
                    output,
                    updated_at: now,
                },
            }),
        }
        self.updated_at = now;
    }

    /// Remove an agent's contribution and rebuild the environment by
    /// replaying the remaining contributions in ascending last-write
    /// order, so the most recent surviving write of each field wins.
    pub fn clear_agent(&mut self, agent_id: &AgentId, now: Millis) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| &e.agent_id != agent_id);
        if self.entries.len() == before {
            return false;
        }

        self.environment.clear();
        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        order.sort_by_key(|&i| self.entries[i].contribution.updated_at);
        for i in order {
            if let Some(obj) = self.entries[i].contribution.output.as_object() {
                for key in ENVIRONMENT_KEYS {
                    if let Some(value) = obj.get(key) {
                        self.environment.insert(key.to_string(), value.clone());
                    }
                }
            }
        }
        self.updated_at = now;
        true
    }

    pub fn contribution_of(&self, agent_id: &AgentId) -> Option<&WorldContribution> {
        self.entries
            .iter()
            .find(|e| &e.agent_id == agent_id)
            .map(|e| &e.contribution)
    }

    /// Build the aggregate snapshot. Everything is deep-copied; array
    /// items are tagged with the contributing agent.
    pub fn snapshot(&self) -> WorldSnapshot {
        let mut snapshot = WorldSnapshot {
            environment: self.environment.clone(),
            contributions: Vec::new(),
            voxels: Vec::new(),
            catalog_items: Vec::new(),
            generated_items: Vec::new(),
            updated_at: self.updated_at,
        };

        for entry in &self.entries {
            let output = entry.contribution.output.as_object();
            let elements = output
                .and_then(|o| o.get("elements"))
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            snapshot.contributions.push(ContributionView {
                agent_id: entry.agent_id.clone(),
                bot_name: entry.bot_name.clone(),
                elements,
                updated_at: entry.contribution.updated_at,
            });

            for (key, sink) in [
                ("voxels", &mut snapshot.voxels),
                ("catalog_items", &mut snapshot.catalog_items),
                ("generated_items", &mut snapshot.generated_items),
            ] {
                if let Some(items) = output.and_then(|o| o.get(key)).and_then(Value::as_array) {
                    for item in items {
                        let mut tagged = item.clone();
                        if let Some(obj) = tagged.as_object_mut() {
                            obj.insert(
                                "agent_id".to_string(),
                                Value::String(entry.agent_id.0.clone()),
                            );
                            obj.insert(
                                "bot_name".to_string(),
                                Value::String(entry.bot_name.clone()),
                            );
                        }
                        sink.push(tagged);
                    }
                }
            }
        }
        snapshot
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.environment.clear();
        self.updated_at = 0;
    }
}

impl Default for WorldStore {
    fn default() -> Self {
        Self::new()
    }
}
