//! Error values with stable machine codes.
//!
//! Every rejection the core produces is a `CoreError` carrying a short
//! machine code plus optional structured detail. Errors never mutate
//! state; adapters pass the code through verbatim.

use serde::{Deserialize, Serialize};

/// Result of running the validator. Warnings accompany accepted writes
/// and are propagated to the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Validation {
    pub accepted: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Validation {
    pub fn ok() -> Self {
        Self {
            accepted: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        self.accepted = false;
        self.errors.push(msg.into());
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }
}

/// Every rejection the core can produce.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    // Input malformed
    InvalidName,
    NameRequired,
    CodeRequired,
    InvalidSlot,
    InvalidJson(String),
    // Authorization
    Unauthorized,
    NotOwner,
    NameTaken,
    // Policy / quota
    Cooldown { retry_after: u64 },
    MaxPlacementsReached,
    MaxSessionsReached,
    // State preconditions
    SessionNotFound,
    NotInSession,
    PlacementNotFound,
    MovementInProgress,
    AlreadyAtDestination,
    InvalidHoldSeconds,
    PresenceStateDisallowed,
    SystemStateDisallowed,
    PresenceDurationTooLong,
    InvalidReason,
    LegacyActionUnsupported,
    // Ritual
    NotInNominatePhase,
    NotInVotePhase,
    BpmOrKeyRequired,
    AlreadyNominatedBpm,
    AlreadyNominatedKey,
    AlreadyVotedBpm,
    AlreadyVotedKey,
    InvalidBpmCandidate,
    InvalidKeyCandidate,
    CannotVoteOwnBpm,
    CannotVoteOwnKey,
    // Validation
    ValidationFailed { details: Vec<String> },
}

impl CoreError {
    /// The stable machine code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::InvalidName => "invalid_name",
            CoreError::NameRequired => "name_required",
            CoreError::CodeRequired => "code_required",
            CoreError::InvalidSlot => "invalid_slot",
            CoreError::InvalidJson(_) => "invalid_json",
            CoreError::Unauthorized => "unauthorized",
            CoreError::NotOwner => "not_owner",
            CoreError::NameTaken => "name_taken",
            CoreError::Cooldown { .. } => "cooldown",
            CoreError::MaxPlacementsReached => "max_placements_reached",
            CoreError::MaxSessionsReached => "max_sessions_reached",
            CoreError::SessionNotFound => "session_not_found",
            CoreError::NotInSession => "not_in_session",
            CoreError::PlacementNotFound => "placement_not_found",
            CoreError::MovementInProgress => "movement_in_progress",
            CoreError::AlreadyAtDestination => "already_at_destination",
            CoreError::InvalidHoldSeconds => "invalid_hold_seconds",
            CoreError::PresenceStateDisallowed => "presence_state_disallowed",
            CoreError::SystemStateDisallowed => "system_state_disallowed",
            CoreError::PresenceDurationTooLong => "presence_duration_too_long",
            CoreError::InvalidReason => "invalid_reason",
            CoreError::LegacyActionUnsupported => "legacy_action_unsupported",
            CoreError::NotInNominatePhase => "not_in_nominate_phase",
            CoreError::NotInVotePhase => "not_in_vote_phase",
            CoreError::BpmOrKeyRequired => "bpm_or_key_required",
            CoreError::AlreadyNominatedBpm => "already_nominated_bpm",
            CoreError::AlreadyNominatedKey => "already_nominated_key",
            CoreError::AlreadyVotedBpm => "already_voted_bpm",
            CoreError::AlreadyVotedKey => "already_voted_key",
            CoreError::InvalidBpmCandidate => "invalid_bpm_candidate",
            CoreError::InvalidKeyCandidate => "invalid_key_candidate",
            CoreError::CannotVoteOwnBpm => "cannot_vote_own_bpm",
            CoreError::CannotVoteOwnKey => "cannot_vote_own_key",
            CoreError::ValidationFailed { .. } => "validation_failed",
        }
    }

    /// Seconds until retry, for cooldown errors.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            CoreError::Cooldown { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    /// Per-rule detail strings, for validation failures.
    pub fn details(&self) -> Option<&[String]> {
        match self {
            CoreError::ValidationFailed { details } => Some(details),
            _ => None,
        }
    }
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::Cooldown { retry_after } => {
                write!(f, "cooldown (retry after {}s)", retry_after)
            }
            CoreError::InvalidJson(detail) => write!(f, "invalid_json: {}", detail),
            CoreError::ValidationFailed { details } => {
                write!(f, "validation_failed: {}", details.join("; "))
            }
            other => write!(f, "{}", other.code()),
        }
    }
}

impl std::error::Error for CoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_carries_retry_after() {
        let e = CoreError::Cooldown { retry_after: 42 };
        assert_eq!(e.code(), "cooldown");
        assert_eq!(e.retry_after(), Some(42));
        assert_eq!(e.to_string(), "cooldown (retry after 42s)");
    }

    #[test]
    fn validation_carries_details() {
        let e = CoreError::ValidationFailed {
            details: vec!["too long".into()],
        };
        assert_eq!(e.details().unwrap().len(), 1);
    }
}
