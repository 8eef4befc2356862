//! Spatial music placements with per-agent quota and cooldown.

use std::collections::HashMap;

use synthmob_types::{
    Agent, AgentId, CoreError, InstrumentType, Millis, MusicPlacement, PlacementId, Position,
    MAX_PLACEMENTS_PER_AGENT, PLACEMENT_COOLDOWN_SECS,
};

use crate::clock::secs_ceil;
use crate::ids;

pub struct PlacementStore {
    placements: Vec<MusicPlacement>,
    cooldowns: HashMap<AgentId, Millis>,
}

impl PlacementStore {
    pub fn new() -> Self {
        Self {
            placements: Vec::new(),
            cooldowns: HashMap::new(),
        }
    }

    pub fn count_for(&self, agent_id: &AgentId) -> usize {
        self.placements
            .iter()
            .filter(|p| &p.agent_id == agent_id)
            .count()
    }

    pub fn cooldown_remaining_ms(&self, agent_id: &AgentId, now: Millis) -> Option<Millis> {
        let expiry = self.cooldowns.get(agent_id)?;
        if *expiry > now {
            Some(expiry - now)
        } else {
            None
        }
    }

    /// Place an instrument. The caller validates the pattern; this
    /// enforces cooldown and quota and clamps the position.
    pub fn place(
        &mut self,
        agent: &Agent,
        instrument_type: InstrumentType,
        pattern: &str,
        position: Position,
        now: Millis,
    ) -> Result<MusicPlacement, CoreError> {
        if let Some(remaining) = self.cooldown_remaining_ms(&agent.id, now) {
            return Err(CoreError::Cooldown {
                retry_after: secs_ceil(remaining),
            });
        }
        if self.count_for(&agent.id) >= MAX_PLACEMENTS_PER_AGENT {
            return Err(CoreError::MaxPlacementsReached);
        }

        let placement = MusicPlacement {
            id: ids::new_placement_id(),
            agent_id: agent.id.clone(),
            bot_name: agent.name.clone(),
            instrument_type,
            pattern: pattern.to_string(),
            position: position.clamped(),
            created_at: now,
            updated_at: now,
        };
        self.placements.push(placement.clone());
        self.cooldowns
            .insert(agent.id.clone(), now + PLACEMENT_COOLDOWN_SECS * 1000);
        Ok(placement)
    }

    /// Update a placement's pattern. Owner only.
    pub fn update(
        &mut self,
        agent_id: &AgentId,
        placement_id: &PlacementId,
        pattern: &str,
        now: Millis,
    ) -> Result<MusicPlacement, CoreError> {
        let placement = self
            .placements
            .iter_mut()
            .find(|p| &p.id == placement_id)
            .ok_or(CoreError::PlacementNotFound)?;
        if &placement.agent_id != agent_id {
            return Err(CoreError::NotOwner);
        }
        placement.pattern = pattern.to_string();
        placement.updated_at = now;
        Ok(placement.clone())
    }

    /// Remove a placement. Owner only.
    pub fn remove(
        &mut self,
        agent_id: &AgentId,
        placement_id: &PlacementId,
    ) -> Result<(), CoreError> {
        let index = self
            .placements
            .iter()
            .position(|p| &p.id == placement_id)
            .ok_or(CoreError::PlacementNotFound)?;
        if &self.placements[index].agent_id != agent_id {
            return Err(CoreError::NotOwner);
        }
        self.placements.remove(index);
        Ok(())
    }

    /// Deep copy of all placements.
    pub fn snapshot(&self) -> Vec<MusicPlacement> {
        self.placements.clone()
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn clear(&mut self) {
        self.placements.clear();
        self.cooldowns.clear();
    }
}

impl Default for PlacementStore {
    fn default() -> Self {
        Self::new()
    }
}
