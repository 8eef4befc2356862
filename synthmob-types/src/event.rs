//! Published event names and the envelope that crosses the bus.

use serde::{Deserialize, Serialize};

/// Event name constants. These are the wire-visible names streamed to
/// subscribers; payload shapes are produced by the core.
pub mod names {
    pub const CONNECTED: &str = "connected";
    pub const SLOT_UPDATE: &str = "slot_update";
    pub const COMPOSITION: &str = "composition";
    pub const MUSIC_PLACEMENT_SNAPSHOT: &str = "music_placement_snapshot";
    pub const SESSION_CREATED: &str = "session_created";
    pub const SESSION_JOINED: &str = "session_joined";
    pub const SESSION_LEFT: &str = "session_left";
    pub const SESSION_ENDED: &str = "session_ended";
    pub const SESSION_OUTPUT_UPDATED: &str = "session_output_updated";
    pub const SESSION_SNAPSHOT: &str = "session_snapshot";
    pub const JAM_CREATED: &str = "jam_created";
    pub const JAM_JOINED: &str = "jam_joined";
    pub const JAM_LEFT: &str = "jam_left";
    pub const JAM_ENDED: &str = "jam_ended";
    pub const JAM_SNAPSHOT: &str = "jam_snapshot";
    pub const WORLD_SNAPSHOT: &str = "world_snapshot";
    pub const BOT_NAV_PATH_STARTED: &str = "bot_nav_path_started";
    pub const BOT_NAV_ARRIVED: &str = "bot_nav_arrived";
    pub const BOT_PRESENCE_CHANGED: &str = "bot_presence_changed";
    pub const RITUAL_PHASE: &str = "ritual_phase";
    pub const RITUAL_NOMINATION: &str = "ritual_nomination";
    pub const RITUAL_VOTE: &str = "ritual_vote";
    pub const EPOCH_CHANGED: &str = "epoch_changed";
    pub const AGENT_MESSAGE: &str = "agent_message";
    pub const DIRECTIVE_CREATED: &str = "directive_created";
    pub const ADMIN_RESET: &str = "admin_reset";
}

/// An event as it crosses the bus: a name and a JSON payload.
///
/// Payloads are built once by the core and cloned per subscriber, so no
/// subscriber ever aliases core state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreEvent {
    pub name: String,
    pub payload: serde_json::Value,
}

impl CoreEvent {
    pub fn new(name: &str, payload: serde_json::Value) -> Self {
        Self {
            name: name.to_string(),
            payload,
        }
    }
}
