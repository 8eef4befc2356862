//! Free-form collaborative sessions.

use serde::{Deserialize, Serialize};

use crate::{AgentId, Millis, SessionId};

/// Cap on simultaneously active sessions.
pub const MAX_SESSIONS: usize = 50;

/// Session titles are truncated to this many characters.
pub const MAX_TITLE_LEN: usize = 80;

/// Sessions spawn on an annulus between these radii when no position is given.
pub const SPAWN_RADIUS_MIN: f64 = 15.0;
pub const SPAWN_RADIUS_MAX: f64 = 35.0;

/// Positions inside the stage exclusion radius are pushed radially out.
pub const STAGE_EXCLUSION_RADIUS: f64 = 7.4;
pub const STAGE_PUSH_RADIUS: f64 = 9.4;

/// Room boundaries along the x axis.
pub const EAST_WING_X: f64 = 79.0;
pub const WEST_WING_X: f64 = -79.0;

/// What a session collaborates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Music,
    Visual,
    World,
    Game,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Music => "music",
            SessionType::Visual => "visual",
            SessionType::World => "world",
            SessionType::Game => "game",
        }
    }
}

/// Named region of the arena a session sits in, derived from x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Room {
    Center,
    EastWing,
    WestWing,
}

impl Room {
    pub fn as_str(&self) -> &'static str {
        match self {
            Room::Center => "center",
            Room::EastWing => "east_wing",
            Room::WestWing => "west_wing",
        }
    }

    /// Derive the room from an x coordinate.
    pub fn from_x(x: f64) -> Self {
        if x >= EAST_WING_X {
            Room::EastWing
        } else if x <= WEST_WING_X {
            Room::WestWing
        } else {
            Room::Center
        }
    }
}

/// Role of a participant within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionRole {
    Creator,
    Contributor,
}

/// Where a session lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionPosition {
    pub x: f64,
    pub z: f64,
    pub room: Room,
}

impl SessionPosition {
    pub fn at(x: f64, z: f64) -> Self {
        Self {
            x,
            z,
            room: Room::from_x(x),
        }
    }
}

/// One member of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub agent_id: AgentId,
    pub bot_name: String,
    pub joined_at: Millis,
    pub role: SessionRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
}

/// A collaborative session. Invariants: the creator is always a participant,
/// and an empty session is destroyed in the same operation that empties it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub session_type: SessionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub creator_agent_id: AgentId,
    pub creator_bot_name: String,
    pub position: SessionPosition,
    pub created_at: Millis,
    pub updated_at: Millis,
    pub participants: Vec<Participant>,
    pub meta: serde_json::Value,
}

impl Session {
    pub fn participant(&self, agent_id: &AgentId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.agent_id == agent_id)
    }

    pub fn participant_mut(&mut self, agent_id: &AgentId) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| &p.agent_id == agent_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_from_x_boundaries() {
        assert_eq!(Room::from_x(79.0), Room::EastWing);
        assert_eq!(Room::from_x(78.9), Room::Center);
        assert_eq!(Room::from_x(-79.0), Room::WestWing);
        assert_eq!(Room::from_x(-78.9), Room::Center);
        assert_eq!(Room::from_x(0.0), Room::Center);
    }
}
