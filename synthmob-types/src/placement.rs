//! Spatial music placements.

use serde::{Deserialize, Serialize};

use crate::{AgentId, Millis, PlacementId};

/// Maximum simultaneous placements per agent.
pub const MAX_PLACEMENTS_PER_AGENT: usize = 5;

/// Per-agent cooldown after a successful placement.
pub const PLACEMENT_COOLDOWN_SECS: u64 = 15;

/// Placement positions are clamped to this half-extent on both axes.
pub const PLACEMENT_EXTENT: f64 = 150.0;

/// Instruments that can be placed in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentType {
    #[serde(rename = "808")]
    Tr808,
    Cello,
    DustyPiano,
    Synth,
    Prophet5,
    Synthesizer,
    Tr66,
}

impl InstrumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentType::Tr808 => "808",
            InstrumentType::Cello => "cello",
            InstrumentType::DustyPiano => "dusty_piano",
            InstrumentType::Synth => "synth",
            InstrumentType::Prophet5 => "prophet_5",
            InstrumentType::Synthesizer => "synthesizer",
            InstrumentType::Tr66 => "tr66",
        }
    }
}

/// A point on the arena floor (xz plane).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub z: f64,
}

impl Position {
    /// Clamp both axes to the placement extent.
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(-PLACEMENT_EXTENT, PLACEMENT_EXTENT),
            z: self.z.clamp(-PLACEMENT_EXTENT, PLACEMENT_EXTENT),
        }
    }
}

/// An instrument placed somewhere in the arena by an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicPlacement {
    pub id: PlacementId,
    pub agent_id: AgentId,
    pub bot_name: String,
    pub instrument_type: InstrumentType,
    pub pattern: String,
    pub position: Position,
    pub created_at: Millis,
    pub updated_at: Millis,
}
