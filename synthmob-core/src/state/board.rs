//! The 8-slot competition board.

use std::collections::HashMap;

use synthmob_types::board::BOARD_LAYOUT;
use synthmob_types::{Agent, AgentId, AgentPublic, CoreError, Millis, Slot, SLOT_COOLDOWN_SECS};

use crate::clock::secs_ceil;

/// Fixed-size board plus per-agent write cooldowns (absolute expiry).
pub struct SlotBoard {
    slots: Vec<Slot>,
    cooldowns: HashMap<AgentId, Millis>,
}

/// Result of a successful slot write.
#[derive(Debug)]
pub struct SlotWrite {
    pub slot: Slot,
    pub previous_agent: Option<AgentPublic>,
}

impl SlotBoard {
    pub fn new() -> Self {
        Self {
            slots: BOARD_LAYOUT
                .iter()
                .map(|(id, slot_type, label)| Slot::empty(*id, *slot_type, label))
                .collect(),
            cooldowns: HashMap::new(),
        }
    }

    pub fn slot(&self, id: u8) -> Option<&Slot> {
        self.slots.get(id.checked_sub(1)? as usize)
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slots_held_by(&self, agent_id: &AgentId) -> Vec<u8> {
        self.slots
            .iter()
            .filter(|s| s.agent.as_ref().map(|a| &a.id) == Some(agent_id))
            .map(|s| s.id)
            .collect()
    }

    /// Milliseconds until this agent may write again, if cooling down.
    pub fn cooldown_remaining_ms(&self, agent_id: &AgentId, now: Millis) -> Option<Millis> {
        let expiry = self.cooldowns.get(agent_id)?;
        if *expiry > now {
            Some(expiry - now)
        } else {
            None
        }
    }

    /// Overwrite a slot. The caller has already validated the code; this
    /// enforces the slot id and the cooldown. Last write wins; the
    /// displaced agent's view is reported exactly once, in the result.
    pub fn write(
        &mut self,
        slot_id: u8,
        code: &str,
        agent: &Agent,
        now: Millis,
    ) -> Result<SlotWrite, CoreError> {
        if let Some(remaining) = self.cooldown_remaining_ms(&agent.id, now) {
            return Err(CoreError::Cooldown {
                retry_after: secs_ceil(remaining),
            });
        }
        let slot = self
            .slots
            .get_mut(slot_id.checked_sub(1).ok_or(CoreError::InvalidSlot)? as usize)
            .ok_or(CoreError::InvalidSlot)?;

        let previous_agent = slot.agent.take();
        slot.code = Some(code.to_string());
        slot.agent = Some(agent.public());
        slot.updated_at = Some(now);
        slot.votes = 0;

        self.cooldowns
            .insert(agent.id.clone(), now + SLOT_COOLDOWN_SECS * 1000);

        Ok(SlotWrite {
            slot: slot.clone(),
            previous_agent,
        })
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for SlotBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(name: &str) -> Agent {
        Agent {
            id: AgentId(format!("agt_{}", name)),
            name: name.to_string(),
            token: "t".repeat(64),
            created_at: 0,
            total_placements: 0,
            reputation: 0,
            owner_address: None,
        }
    }

    #[test]
    fn write_sets_code_agent_and_cooldown() {
        let mut board = SlotBoard::new();
        let alice = agent("alice");

        let write = board.write(1, "s(\"bd sd\")", &alice, 10_000).unwrap();
        assert_eq!(write.slot.code.as_deref(), Some("s(\"bd sd\")"));
        assert_eq!(write.slot.agent.as_ref().unwrap().name, "alice");
        assert!(write.previous_agent.is_none());

        // Same agent immediately: cooldown with retry_after near 60.
        let err = board.write(2, "s(\"hh*4\")", &alice, 10_500).unwrap_err();
        match err {
            CoreError::Cooldown { retry_after } => assert!((59..=60).contains(&retry_after)),
            other => panic!("expected cooldown, got {:?}", other),
        }

        // After expiry the write goes through.
        assert!(board.write(2, "s(\"hh*4\")", &alice, 70_001).is_ok());
    }

    #[test]
    fn overwrite_reports_displaced_agent_once() {
        let mut board = SlotBoard::new();
        let alice = agent("alice");
        let bob = agent("bob");

        board.write(1, "s(\"bd\")", &alice, 0).unwrap();
        let write = board.write(1, "s(\"bd*4\")", &bob, 1000).unwrap();
        assert_eq!(write.previous_agent.unwrap().name, "alice");
        assert_eq!(write.slot.agent.as_ref().unwrap().name, "bob");
        assert_eq!(write.slot.code.as_deref(), Some("s(\"bd*4\")"));
    }

    #[test]
    fn invalid_slot_ids() {
        let mut board = SlotBoard::new();
        let a = agent("a");
        assert_eq!(
            board.write(0, "s(\"bd\")", &a, 0).unwrap_err(),
            CoreError::InvalidSlot
        );
        assert_eq!(
            board.write(9, "s(\"bd\")", &a, 0).unwrap_err(),
            CoreError::InvalidSlot
        );
    }

    #[test]
    fn code_and_agent_are_set_together() {
        let mut board = SlotBoard::new();
        for slot in board.slots() {
            assert_eq!(slot.code.is_none(), slot.agent.is_none());
        }
        board.write(3, "s(\"bass\")", &agent("a"), 0).unwrap();
        for slot in board.slots() {
            assert_eq!(slot.code.is_none(), slot.agent.is_none());
        }
    }

    #[test]
    fn write_resets_votes() {
        let mut board = SlotBoard::new();
        let a = agent("a");
        board.write(1, "s(\"bd\")", &a, 0).unwrap();
        board.slots[0].votes = 7;
        let write = board.write(1, "s(\"sd\")", &agent("b"), 1000).unwrap();
        assert_eq!(write.slot.votes, 0);
    }
}
