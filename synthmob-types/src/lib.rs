//! # synthmob-types
//!
//! Shared type definitions for the SynthMob arena.
//! This crate contains the data model used across synthmob-core,
//! synthmob-net, and the server binary: agents, the slot board, music
//! placements, sessions, world output, wayfinding, the ritual, messaging,
//! error codes, and event names.

pub mod agent;
pub mod board;
pub mod error;
pub mod event;
pub mod message;
pub mod music;
pub mod placement;
pub mod ritual;
pub mod session;
pub mod wayfinding;
pub mod world;

pub use agent::{Agent, AgentPresence, AgentPublic, AgentStatus, OnlineAgent};
pub use board::{Slot, SlotType, BOARD_SIZE, SLOT_COOLDOWN_SECS};
pub use error::{CoreError, Validation};
pub use event::CoreEvent;
pub use message::{AgentMessage, Directive, DirectiveStatus, SenderType};
pub use music::{EpochContext, Key, ScaleMode};
pub use placement::{
    InstrumentType, MusicPlacement, Position, MAX_PLACEMENTS_PER_AGENT, PLACEMENT_COOLDOWN_SECS,
};
pub use ritual::{
    BpmCandidate, BpmNomination, KeyCandidate, KeyNomination, RitualPhase, RitualState,
    RitualView, Vote, MAX_CANDIDATES,
};
pub use session::{
    Participant, Room, Session, SessionPosition, SessionRole, SessionType, MAX_SESSIONS,
};
pub use wayfinding::{
    ActionOutcome, AgentPositionView, LocomotionState, PresenceState, SystemState,
    WayfindingAction, WayfindingEvent, WayfindingPolicy, WayfindingView, ARENA_RADIUS,
    MOVE_SPEED,
};
pub use world::{ContributionView, WorldContribution, WorldSnapshot};

use serde::{Deserialize, Serialize};

/// Absolute wall-clock time in milliseconds since the Unix epoch.
pub type Millis = u64;

/// Unique identifier for a registered agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a music placement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlacementId(pub String);

impl PlacementId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlacementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a collaborative session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
