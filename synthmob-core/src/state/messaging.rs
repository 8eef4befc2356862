//! Bounded message ring and pending paid directives.

use std::collections::{HashMap, VecDeque};

use synthmob_types::message::{
    DIRECTIVE_RING_CAPACITY, HUMAN_RATE_LIMIT_SECS, MAX_AGENT_MESSAGE_LEN, MAX_HUMAN_MESSAGE_LEN,
    MESSAGE_RING_CAPACITY,
};
use synthmob_types::{
    Agent, AgentId, AgentMessage, CoreError, Directive, DirectiveStatus, Millis, SenderType,
};

use crate::clock::secs_ceil;

fn truncated(content: &str, max: usize) -> String {
    if content.chars().count() > max {
        content.chars().take(max).collect()
    } else {
        content.to_string()
    }
}

pub struct MessageStore {
    messages: VecDeque<AgentMessage>,
    directives: VecDeque<Directive>,
    /// Last human post per IP hash, for the rate limit.
    human_last_post: HashMap<u64, Millis>,
    next_message_id: u64,
    next_directive_id: u64,
}

impl MessageStore {
    pub fn new() -> Self {
        Self {
            messages: VecDeque::new(),
            directives: VecDeque::new(),
            human_last_post: HashMap::new(),
            next_message_id: 1,
            next_directive_id: 1,
        }
    }

    fn push_message(&mut self, message: AgentMessage) -> AgentMessage {
        if self.messages.len() >= MESSAGE_RING_CAPACITY {
            self.messages.pop_front();
        }
        self.messages.push_back(message.clone());
        message
    }

    /// Add an agent message. Content is truncated, never rejected.
    pub fn add_agent_message(
        &mut self,
        from: &Agent,
        content: &str,
        to_agent_id: Option<AgentId>,
        now: Millis,
    ) -> AgentMessage {
        let id = self.next_message_id;
        self.next_message_id += 1;
        self.push_message(AgentMessage {
            id,
            sender_type: SenderType::Agent,
            from_agent_id: Some(from.id.clone()),
            from_name: from.name.clone(),
            content: truncated(content, MAX_AGENT_MESSAGE_LEN),
            to_agent_id,
            at: now,
        })
    }

    /// Add a human message, rate-limited per IP hash.
    pub fn add_human_message(
        &mut self,
        sender_type: SenderType,
        from_name: &str,
        content: &str,
        ip_hash: u64,
        now: Millis,
    ) -> Result<AgentMessage, CoreError> {
        let window = HUMAN_RATE_LIMIT_SECS * 1000;
        if let Some(last) = self.human_last_post.get(&ip_hash) {
            let elapsed = now.saturating_sub(*last);
            if elapsed < window {
                return Err(CoreError::Cooldown {
                    retry_after: secs_ceil(window - elapsed),
                });
            }
        }
        self.human_last_post.insert(ip_hash, now);

        let id = self.next_message_id;
        self.next_message_id += 1;
        Ok(self.push_message(AgentMessage {
            id,
            sender_type,
            from_agent_id: None,
            from_name: from_name.to_string(),
            content: truncated(content, MAX_HUMAN_MESSAGE_LEN),
            to_agent_id: None,
            at: now,
        }))
    }

    /// All messages, oldest first.
    pub fn messages(&self) -> Vec<AgentMessage> {
        self.messages.iter().cloned().collect()
    }

    /// Messages visible to a specific reader.
    pub fn messages_for(&self, reader: &AgentId) -> Vec<AgentMessage> {
        self.messages
            .iter()
            .filter(|m| m.visible_to(reader))
            .cloned()
            .collect()
    }

    /// Append a directive with `pending` status.
    pub fn add_directive(
        &mut self,
        from_address: &str,
        to_agent_id: AgentId,
        content: &str,
        tx_hash: &str,
        now: Millis,
    ) -> Directive {
        let id = self.next_directive_id;
        self.next_directive_id += 1;
        let directive = Directive {
            id,
            from_address: from_address.to_string(),
            to_agent_id,
            content: truncated(content, MAX_HUMAN_MESSAGE_LEN),
            tx_hash: tx_hash.to_string(),
            status: DirectiveStatus::Pending,
            created_at: now,
            delivered_at: None,
        };
        if self.directives.len() >= DIRECTIVE_RING_CAPACITY {
            self.directives.pop_front();
        }
        self.directives.push_back(directive.clone());
        directive
    }

    /// Pending directives for an agent. Delivered-on-read: each returned
    /// directive atomically flips to `delivered`.
    pub fn take_pending(&mut self, agent_id: &AgentId, now: Millis) -> Vec<Directive> {
        let mut delivered = Vec::new();
        for directive in self.directives.iter_mut() {
            if &directive.to_agent_id == agent_id && directive.status == DirectiveStatus::Pending {
                directive.status = DirectiveStatus::Delivered;
                directive.delivered_at = Some(now);
                delivered.push(directive.clone());
            }
        }
        delivered
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn directive_count(&self) -> usize {
        self.directives.len()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.directives.clear();
        self.human_last_post.clear();
        self.next_message_id = 1;
        self.next_directive_id = 1;
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}
