//! The periodic world-parameter ritual: nominate, vote, result.

use serde::{Deserialize, Serialize};

use crate::{AgentId, EpochContext, Key, Millis, ScaleMode};

/// How many candidates survive the nomination tally per track.
pub const MAX_CANDIDATES: usize = 3;

/// Phase of the ritual cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RitualPhase {
    Idle,
    Nominate,
    Vote,
    Result,
}

impl RitualPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RitualPhase::Idle => "idle",
            RitualPhase::Nominate => "nominate",
            RitualPhase::Vote => "vote",
            RitualPhase::Result => "result",
        }
    }
}

/// A BPM nomination. One per agent per cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BpmNomination {
    pub bpm: u16,
    pub nominated_by_agent_id: AgentId,
    pub nominated_by: String,
    pub reasoning: String,
    pub submitted_at: Millis,
}

/// A key+scale nomination. One per agent per cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyNomination {
    pub key: Key,
    pub scale: ScaleMode,
    pub nominated_by_agent_id: AgentId,
    pub nominated_by: String,
    pub reasoning: String,
    pub submitted_at: Millis,
}

/// A surviving BPM candidate after the nomination tally. `index` is 1-based
/// and is what votes reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BpmCandidate {
    pub index: usize,
    pub bpm: u16,
    pub count: u32,
    pub nominated_by_agent_id: AgentId,
    pub nominated_by: String,
}

/// A surviving key candidate after the nomination tally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyCandidate {
    pub index: usize,
    pub key: Key,
    pub scale: ScaleMode,
    pub count: u32,
    pub nominated_by_agent_id: AgentId,
    pub nominated_by: String,
}

/// A single vote for a candidate index on one track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub voter_agent_id: AgentId,
    pub candidate_index: usize,
    pub at: Millis,
}

/// Full ritual state, owned by the core. External readers get
/// [`RitualView`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RitualState {
    pub id: String,
    pub phase: RitualPhase,
    pub phase_started_at: Millis,
    pub phase_ends_at: Millis,
    pub ritual_number: u64,
    pub bpm_nominations: Vec<BpmNomination>,
    pub key_nominations: Vec<KeyNomination>,
    pub bpm_candidates: Vec<BpmCandidate>,
    pub key_candidates: Vec<KeyCandidate>,
    pub bpm_votes: Vec<Vote>,
    pub key_votes: Vec<Vote>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpm_winner: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_winner: Option<(Key, ScaleMode)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_epoch: Option<EpochContext>,
}

/// Public candidate views strip the nominator's agent id but keep the
/// bot name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BpmCandidateView {
    pub index: usize,
    pub bpm: u16,
    pub count: u32,
    pub nominated_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyCandidateView {
    pub index: usize,
    pub key: Key,
    pub scale: ScaleMode,
    pub count: u32,
    pub nominated_by: String,
}

/// Ritual state as shown to a requesting agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RitualView {
    pub phase: RitualPhase,
    pub ritual_number: u64,
    pub phase_remaining_seconds: u64,
    pub bpm_candidates: Vec<BpmCandidateView>,
    pub key_candidates: Vec<KeyCandidateView>,
    pub has_nominated_bpm: bool,
    pub has_nominated_key: bool,
    pub has_voted_bpm: bool,
    pub has_voted_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpm_winner: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_winner: Option<(Key, ScaleMode)>,
}

impl From<&BpmCandidate> for BpmCandidateView {
    fn from(c: &BpmCandidate) -> Self {
        Self {
            index: c.index,
            bpm: c.bpm,
            count: c.count,
            nominated_by: c.nominated_by.clone(),
        }
    }
}

impl From<&KeyCandidate> for KeyCandidateView {
    fn from(c: &KeyCandidate) -> Self {
        Self {
            index: c.index,
            key: c.key,
            scale: c.scale,
            count: c.count,
            nominated_by: c.nominated_by.clone(),
        }
    }
}
