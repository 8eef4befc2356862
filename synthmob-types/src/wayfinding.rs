//! Continuous-space wayfinding: positions, movement, presence and
//! system postures, and the action surface agents drive them with.

use serde::{Deserialize, Serialize};

use crate::{AgentId, Millis};

/// The arena is a disk of this radius centered on the origin.
pub const ARENA_RADIUS: f64 = 50.0;

/// Movement speed in meters per second.
pub const MOVE_SPEED: f64 = 4.0;

/// Moves shorter than this are rejected as `already_at_destination`.
pub const MIN_MOVE_DISTANCE: f64 = 0.1;

/// Bounds for HOLD_POSITION, in seconds.
pub const HOLD_SECONDS_MIN: u32 = 1;
pub const HOLD_SECONDS_MAX: u32 = 30;

/// Bounds for presence-state durations, in seconds.
pub const PRESENCE_DURATION_MIN: u32 = 1;
pub const PRESENCE_DURATION_MAX: u32 = 300;

/// Reason strings must be 1..=280 characters.
pub const REASON_MAX_LEN: usize = 280;

/// Capacity of the wayfinding event ring.
pub const EVENT_RING_CAPACITY: usize = 500;

/// How many recent events a state read returns.
pub const EVENTS_PER_READ: usize = 12;

/// Whether the agent is standing or traveling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocomotionState {
    Idle,
    Moving,
}

/// Expressive presence labels, independent of movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceState {
    IdlePose,
    Rest,
    Dancing,
    Headbang,
    Sway,
    Clap,
    Jump,
    Spin,
    Wave,
    Point,
    Sit,
    Crouch,
    AirDrums,
    Conducting,
}

impl PresenceState {
    pub const ALL: [PresenceState; 14] = [
        PresenceState::IdlePose,
        PresenceState::Rest,
        PresenceState::Dancing,
        PresenceState::Headbang,
        PresenceState::Sway,
        PresenceState::Clap,
        PresenceState::Jump,
        PresenceState::Spin,
        PresenceState::Wave,
        PresenceState::Point,
        PresenceState::Sit,
        PresenceState::Crouch,
        PresenceState::AirDrums,
        PresenceState::Conducting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceState::IdlePose => "idle_pose",
            PresenceState::Rest => "rest",
            PresenceState::Dancing => "dancing",
            PresenceState::Headbang => "headbang",
            PresenceState::Sway => "sway",
            PresenceState::Clap => "clap",
            PresenceState::Jump => "jump",
            PresenceState::Spin => "spin",
            PresenceState::Wave => "wave",
            PresenceState::Point => "point",
            PresenceState::Sit => "sit",
            PresenceState::Crouch => "crouch",
            PresenceState::AirDrums => "air_drums",
            PresenceState::Conducting => "conducting",
        }
    }

    /// The only presence states permitted while the system posture is
    /// anything other than `normal`.
    pub fn allowed_under_degraded(&self) -> bool {
        matches!(self, PresenceState::IdlePose | PresenceState::Rest)
    }
}

/// Runtime posture labels. Non-normal postures restrict presence states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemState {
    Normal,
    RateLimited,
    ValidationRetry,
    CooldownLocked,
    ModelError,
    StreamDegraded,
    Desynced,
    AssetLoading,
    AssetFallback,
    /// Only the core itself may set this; it is rejected on the action API.
    Suspended,
}

impl SystemState {
    pub const ALL: [SystemState; 10] = [
        SystemState::Normal,
        SystemState::RateLimited,
        SystemState::ValidationRetry,
        SystemState::CooldownLocked,
        SystemState::ModelError,
        SystemState::StreamDegraded,
        SystemState::Desynced,
        SystemState::AssetLoading,
        SystemState::AssetFallback,
        SystemState::Suspended,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SystemState::Normal => "normal",
            SystemState::RateLimited => "rate_limited",
            SystemState::ValidationRetry => "validation_retry",
            SystemState::CooldownLocked => "cooldown_locked",
            SystemState::ModelError => "model_error",
            SystemState::StreamDegraded => "stream_degraded",
            SystemState::Desynced => "desynced",
            SystemState::AssetLoading => "asset_loading",
            SystemState::AssetFallback => "asset_fallback",
            SystemState::Suspended => "suspended",
        }
    }
}

/// Actions an agent can submit against its own position.
///
/// Legacy stage-era action types are kept as explicit variants so old
/// clients are rejected with a distinguishing code instead of a parse error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WayfindingAction {
    #[serde(rename = "MOVE_TO")]
    MoveTo {
        x: f64,
        z: f64,
        /// Required; an absent or empty reason rejects as `invalid_reason`.
        #[serde(default)]
        reason: String,
    },
    #[serde(rename = "HOLD_POSITION")]
    HoldPosition {
        hold_seconds: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    #[serde(rename = "SET_PRESENCE_STATE")]
    SetPresenceState {
        state: PresenceState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_sec: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    #[serde(rename = "CLEAR_PRESENCE_STATE")]
    ClearPresenceState {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    #[serde(rename = "SET_SYSTEM_STATE")]
    SetSystemState {
        state: SystemState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    #[serde(rename = "CLEAR_SYSTEM_STATE")]
    ClearSystemState {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    #[serde(rename = "MOVE_TO_NODE")]
    MoveToNode {},
    #[serde(rename = "JOIN_SLOT_QUEUE")]
    JoinSlotQueue {},
    #[serde(rename = "LEAVE_SLOT_QUEUE")]
    LeaveSlotQueue {},
    #[serde(rename = "CLAIM_STAGE_POSITION")]
    ClaimStagePosition {},
    #[serde(rename = "RELEASE_STAGE_POSITION")]
    ReleaseStagePosition {},
    #[serde(rename = "FOCUS_SLOT")]
    FocusSlot {},
}

impl WayfindingAction {
    pub fn is_legacy(&self) -> bool {
        matches!(
            self,
            WayfindingAction::MoveToNode {}
                | WayfindingAction::JoinSlotQueue {}
                | WayfindingAction::LeaveSlotQueue {}
                | WayfindingAction::ClaimStagePosition {}
                | WayfindingAction::ReleaseStagePosition {}
                | WayfindingAction::FocusSlot {}
        )
    }

    /// The reason string carried by the action, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            WayfindingAction::MoveTo { reason, .. } => Some(reason),
            WayfindingAction::HoldPosition { reason, .. }
            | WayfindingAction::SetPresenceState { reason, .. }
            | WayfindingAction::ClearPresenceState { reason }
            | WayfindingAction::SetSystemState { reason, .. }
            | WayfindingAction::ClearSystemState { reason } => reason.as_deref(),
            _ => None,
        }
    }
}

/// One agent's position as exposed to readers. The full form (own agent)
/// includes movement details; light views of other agents omit them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPositionView {
    pub agent_id: AgentId,
    pub bot_name: String,
    pub x: f64,
    pub z: f64,
    pub locomotion_state: LocomotionState,
    pub presence_state: PresenceState,
    pub system_state: SystemState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movement_to: Option<(f64, f64)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movement_progress_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movement_completes_at: Option<Millis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub travel_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_until: Option<Millis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_until: Option<Millis>,
}

/// Movement policy constants, included in every state read so clients
/// need not hard-code them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WayfindingPolicy {
    pub arena_radius: f64,
    pub move_speed_mps: f64,
    pub min_move_distance: f64,
    pub hold_seconds_min: u32,
    pub hold_seconds_max: u32,
    pub presence_duration_max_sec: u32,
    pub reason_max_len: usize,
}

impl Default for WayfindingPolicy {
    fn default() -> Self {
        Self {
            arena_radius: ARENA_RADIUS,
            move_speed_mps: MOVE_SPEED,
            min_move_distance: MIN_MOVE_DISTANCE,
            hold_seconds_min: HOLD_SECONDS_MIN,
            hold_seconds_max: HOLD_SECONDS_MAX,
            presence_duration_max_sec: PRESENCE_DURATION_MAX,
            reason_max_len: REASON_MAX_LEN,
        }
    }
}

/// A wayfinding activity record. Kept in a capped ring of 500; state reads
/// return the last 12.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WayfindingEvent {
    pub event_id: u64,
    pub at: Millis,
    pub bot_name: String,
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_z: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_z: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub travel_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completes_at: Option<Millis>,
}

/// Full wayfinding read: own state, light views of everyone else, the
/// policy block, and recent activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WayfindingView {
    #[serde(rename = "self")]
    pub self_view: AgentPositionView,
    pub others: Vec<AgentPositionView>,
    pub policy: WayfindingPolicy,
    pub recent_events: Vec<WayfindingEvent>,
}

/// Result of submitting a wayfinding action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    pub state: WayfindingView,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_wire_tags() {
        let a: WayfindingAction =
            serde_json::from_str(r#"{"type":"MOVE_TO","x":1.0,"z":2.0,"reason":"go"}"#).unwrap();
        assert!(matches!(a, WayfindingAction::MoveTo { .. }));
        assert!(!a.is_legacy());

        let a: WayfindingAction =
            serde_json::from_str(r#"{"type":"JOIN_SLOT_QUEUE","slot":3}"#).unwrap();
        assert!(a.is_legacy());
    }

    #[test]
    fn degraded_posture_allows_only_idle_and_rest() {
        let allowed: Vec<_> = PresenceState::ALL
            .iter()
            .filter(|s| s.allowed_under_degraded())
            .collect();
        assert_eq!(allowed.len(), 2);
    }

    #[test]
    fn state_sets_are_complete() {
        assert_eq!(PresenceState::ALL.len(), 14);
        assert_eq!(SystemState::ALL.len(), 10);
    }
}
