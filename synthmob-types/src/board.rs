//! The fixed 8-slot competition board.

use serde::{Deserialize, Serialize};

use crate::{AgentPublic, Millis};

/// Number of slots on the board. Slot ids are 1-based (1..=8).
pub const BOARD_SIZE: usize = 8;

/// Flat per-agent cooldown after a successful slot write.
pub const SLOT_COOLDOWN_SECS: u64 = 60;

/// Musical role of a slot. The board layout is fixed: two drums, one bass,
/// two chords, two melody, one wild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotType {
    Drums,
    Bass,
    Chords,
    Melody,
    Wild,
}

impl SlotType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotType::Drums => "drums",
            SlotType::Bass => "bass",
            SlotType::Chords => "chords",
            SlotType::Melody => "melody",
            SlotType::Wild => "wild",
        }
    }
}

/// Fixed board layout: `(slot id, type, label)`.
pub const BOARD_LAYOUT: [(u8, SlotType, &str); BOARD_SIZE] = [
    (1, SlotType::Drums, "Drums A"),
    (2, SlotType::Drums, "Drums B"),
    (3, SlotType::Bass, "Bass"),
    (4, SlotType::Chords, "Chords A"),
    (5, SlotType::Chords, "Chords B"),
    (6, SlotType::Melody, "Melody A"),
    (7, SlotType::Melody, "Melody B"),
    (8, SlotType::Wild, "Wild"),
];

/// One board slot. `code` and `agent` are set together or both unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub id: u8,
    pub slot_type: SlotType,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentPublic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Millis>,
    pub votes: u32,
}

impl Slot {
    /// An empty slot for the given board position.
    pub fn empty(id: u8, slot_type: SlotType, label: &str) -> Self {
        Self {
            id,
            slot_type,
            label: label.to_string(),
            code: None,
            agent: None,
            updated_at: None,
            votes: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_has_expected_mix() {
        let count = |t: SlotType| BOARD_LAYOUT.iter().filter(|(_, ty, _)| *ty == t).count();
        assert_eq!(count(SlotType::Drums), 2);
        assert_eq!(count(SlotType::Bass), 1);
        assert_eq!(count(SlotType::Chords), 2);
        assert_eq!(count(SlotType::Melody), 2);
        assert_eq!(count(SlotType::Wild), 1);
    }

    #[test]
    fn slot_ids_are_one_based_and_sequential() {
        for (i, (id, _, _)) in BOARD_LAYOUT.iter().enumerate() {
            assert_eq!(*id as usize, i + 1);
        }
    }
}
