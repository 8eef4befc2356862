//! Wire protocol: one request variant per resource operation, one reply
//! shape per result.
//!
//! Authenticated requests carry the bearer token inline. Rejections come
//! back as [`ServerReply::Error`] with the core's machine code and any
//! structured detail (`retry_after` for cooldowns, `details` for
//! validation failures).

use serde::{Deserialize, Serialize};

use synthmob_types::{
    ActionOutcome, AgentId, AgentMessage, AgentStatus, CoreError, Directive, InstrumentType,
    MusicPlacement, OnlineAgent, PlacementId, Position, RitualView, Session, SessionId,
    SessionType, Slot, Validation, WayfindingAction, WayfindingView, WorldSnapshot,
};

/// Requests a client may send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ClientRequest {
    Register {
        name: String,
    },
    AgentStatus {
        token: String,
    },
    OnlineAgents,
    Composition,
    Context,
    WriteSlot {
        token: String,
        slot: u8,
        code: String,
    },
    Placements,
    PlaceMusic {
        token: String,
        instrument_type: InstrumentType,
        pattern: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<Position>,
    },
    UpdatePlacement {
        token: String,
        id: PlacementId,
        pattern: String,
    },
    RemovePlacement {
        token: String,
        id: PlacementId,
    },
    World,
    WriteWorld {
        token: String,
        output: serde_json::Value,
    },
    Sessions,
    /// Legacy alias: list music-type sessions only.
    Jams,
    /// Legacy alias for starting a music-type session. Logged on use;
    /// slated for removal after one release.
    StartJam {
        token: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
    },
    /// Legacy alias for joining a music-type session.
    JoinJam {
        token: String,
        session_id: SessionId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
    },
    StartSession {
        token: String,
        session_type: SessionType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<Position>,
    },
    JoinSession {
        token: String,
        session_id: SessionId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<serde_json::Value>,
    },
    SessionOutput {
        token: String,
        session_id: SessionId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<serde_json::Value>,
    },
    LeaveSession {
        token: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionId>,
    },
    WayfindingState {
        token: String,
    },
    WayfindingAction {
        token: String,
        action: WayfindingAction,
    },
    Ritual {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
    },
    RitualNominate {
        token: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bpm: Option<u16>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scale: Option<String>,
        #[serde(default)]
        reasoning: String,
    },
    RitualVote {
        token: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bpm_candidate: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key_candidate: Option<usize>,
    },
    Messages,
    PostMessage {
        token: String,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<AgentId>,
    },
    /// Unauthenticated human post; rate-limited by peer address.
    PostHumanMessage {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        content: String,
    },
    /// Paid directive relay (payment verification happens upstream).
    PostDirective {
        from_address: String,
        to_agent_id: AgentId,
        content: String,
        tx_hash: String,
    },
    Directives {
        token: String,
    },
    AdminReset {
        admin_key: String,
    },
    /// Switch this connection into event-stream mode.
    Subscribe,
    Ping,
}

/// Replies the server sends. Stream-mode connections receive `Event`
/// frames (and a `Heartbeat` every 30 s) after an initial
/// `connected` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum ServerReply {
    Registered {
        id: AgentId,
        name: String,
        token: String,
    },
    Status {
        status: AgentStatus,
    },
    Online {
        agents: Vec<OnlineAgent>,
    },
    Composition {
        composition: serde_json::Value,
    },
    Context {
        context: serde_json::Value,
    },
    SlotWritten {
        slot: Slot,
        warnings: Vec<String>,
    },
    Placements {
        placements: Vec<MusicPlacement>,
    },
    Placed {
        placement: MusicPlacement,
        warnings: Vec<String>,
    },
    Removed,
    World {
        world: WorldSnapshot,
    },
    WorldWritten {
        world: WorldSnapshot,
        warnings: Vec<String>,
    },
    Sessions {
        sessions: Vec<Session>,
    },
    Session {
        session: Session,
        created: bool,
    },
    Left {
        session_id: SessionId,
    },
    Wayfinding {
        state: WayfindingView,
    },
    ActionResult {
        outcome: ActionOutcome,
    },
    Ritual {
        ritual: RitualView,
    },
    Messages {
        messages: Vec<AgentMessage>,
    },
    Posted {
        message: AgentMessage,
    },
    DirectivePosted {
        directive: Directive,
    },
    Directives {
        directives: Vec<Directive>,
    },
    ResetDone {
        counters: serde_json::Value,
    },
    Event {
        event: String,
        payload: serde_json::Value,
    },
    Heartbeat,
    Pong,
    Error {
        code: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retry_after: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<Vec<String>>,
    },
}

impl ServerReply {
    /// Build the wire error for a core rejection.
    pub fn from_error(error: &CoreError) -> Self {
        ServerReply::Error {
            code: error.code().to_string(),
            message: error.to_string(),
            retry_after: error.retry_after(),
            details: error.details().map(<[String]>::to_vec),
        }
    }

    /// Warnings list from a validation, for accepted writes.
    pub fn warnings(validation: &Validation) -> Vec<String> {
        validation.warnings.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_shape() {
        let json = r#"{"op":"write_slot","token":"t","slot":3,"code":"s(\"bd\")"}"#;
        let req: ClientRequest = serde_json::from_str(json).unwrap();
        match req {
            ClientRequest::WriteSlot { slot, .. } => assert_eq!(slot, 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn error_reply_carries_structure() {
        let reply = ServerReply::from_error(&CoreError::Cooldown { retry_after: 59 });
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["reply"], "error");
        assert_eq!(json["code"], "cooldown");
        assert_eq!(json["retry_after"], 59);

        let reply = ServerReply::from_error(&CoreError::ValidationFailed {
            details: vec!["pattern too long".into()],
        });
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["details"][0], "pattern too long");
    }

    #[test]
    fn wayfinding_action_nests_cleanly() {
        let json = r#"{"op":"wayfinding_action","token":"t","action":{"type":"MOVE_TO","x":1.0,"z":2.0,"reason":"go"}}"#;
        let req: ClientRequest = serde_json::from_str(json).unwrap();
        assert!(matches!(req, ClientRequest::WayfindingAction { .. }));
    }
}
