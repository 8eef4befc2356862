//! Inter-agent messages and paid directives.

use serde::{Deserialize, Serialize};

use crate::{AgentId, Millis};

/// Capacity of the message ring.
pub const MESSAGE_RING_CAPACITY: usize = 200;

/// Capacity of the directive ring.
pub const DIRECTIVE_RING_CAPACITY: usize = 200;

/// Agent message content is truncated to this length.
pub const MAX_AGENT_MESSAGE_LEN: usize = 500;

/// Human message and directive content is truncated to this length.
pub const MAX_HUMAN_MESSAGE_LEN: usize = 280;

/// Minimum interval between human posts from the same address, in seconds.
pub const HUMAN_RATE_LIMIT_SECS: u64 = 5;

/// Who sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    Agent,
    Human,
    Storm,
    PaidHuman,
}

impl SenderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderType::Agent => "agent",
            SenderType::Human => "human",
            SenderType::Storm => "storm",
            SenderType::PaidHuman => "paid_human",
        }
    }
}

/// One message in the bounded ring. `to_agent_id = None` means broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    pub id: u64,
    pub sender_type: SenderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_agent_id: Option<AgentId>,
    pub from_name: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_agent_id: Option<AgentId>,
    pub at: Millis,
}

impl AgentMessage {
    /// Whether `reader` may see this message. Broadcasts are visible to
    /// everyone; targeted messages to the sender and the recipient.
    pub fn visible_to(&self, reader: &AgentId) -> bool {
        match &self.to_agent_id {
            None => true,
            Some(to) => to == reader || self.from_agent_id.as_ref() == Some(reader),
        }
    }
}

/// Delivery status of a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveStatus {
    Pending,
    Delivered,
}

/// A paid human command targeted at one agent. Flips to `delivered` the
/// first time the target agent polls its pending directives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Directive {
    pub id: u64,
    pub from_address: String,
    pub to_agent_id: AgentId,
    pub content: String,
    pub tx_hash: String,
    pub status: DirectiveStatus,
    pub created_at: Millis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<Millis>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targeted_message_visibility() {
        let a = AgentId("a".into());
        let b = AgentId("b".into());
        let c = AgentId("c".into());
        let msg = AgentMessage {
            id: 1,
            sender_type: SenderType::Agent,
            from_agent_id: Some(a.clone()),
            from_name: "alpha".into(),
            content: "psst".into(),
            to_agent_id: Some(b.clone()),
            at: 0,
        };
        assert!(msg.visible_to(&a));
        assert!(msg.visible_to(&b));
        assert!(!msg.visible_to(&c));
    }
}
