//! Ritual state: nominations, candidates, votes, and the tally rules.
//!
//! Phase scheduling lives in `ops::ritual`; this store owns the data and
//! the pure submission/tally/resolution logic.

use synthmob_types::music::{BPM_MAX, BPM_MIN};
use synthmob_types::{
    Agent, AgentId, BpmCandidate, BpmNomination, CoreError, EpochContext, Key, KeyCandidate,
    KeyNomination, Millis, RitualPhase, RitualState, RitualView, ScaleMode, Vote, MAX_CANDIDATES,
};

use crate::ids;

pub struct RitualStore {
    pub state: RitualState,
    /// Absolute time of the next interval fire. Phases use absolute
    /// deadlines too, so a missed tick merely delays the transition.
    pub next_fire_at: Millis,
}

impl RitualStore {
    pub fn new(now: Millis, interval_ms: u64) -> Self {
        Self {
            state: idle_state(0, now),
            next_fire_at: now + interval_ms,
        }
    }

    /// Open a fresh cycle: bump the ritual number and clear the slate.
    /// The caller then either enters nominate or fizzles straight back
    /// to idle.
    pub fn begin_cycle(&mut self, now: Millis) {
        let number = self.state.ritual_number + 1;
        self.state = idle_state(number, now);
    }

    /// Enter the nominate phase of the current cycle.
    pub fn enter_nominate(&mut self, now: Millis, ends_at: Millis, previous: EpochContext) {
        self.state.phase = RitualPhase::Nominate;
        self.state.phase_started_at = now;
        self.state.phase_ends_at = ends_at;
        self.state.previous_epoch = Some(previous);
    }

    /// Enter the vote phase, keeping nominations and candidates.
    pub fn enter_vote(&mut self, now: Millis, ends_at: Millis) {
        self.state.phase = RitualPhase::Vote;
        self.state.phase_started_at = now;
        self.state.phase_ends_at = ends_at;
    }

    /// Enter the result phase with the applied winners.
    pub fn enter_result(&mut self, now: Millis, ends_at: Millis) {
        self.state.phase = RitualPhase::Result;
        self.state.phase_started_at = now;
        self.state.phase_ends_at = ends_at;
    }

    /// Return to idle keeping the ritual number (cycle over or fizzled).
    pub fn finish(&mut self, now: Millis) {
        self.state = idle_state(self.state.ritual_number, now);
    }

    /// Submit nominations for one or both tracks. Validates everything
    /// before mutating, so a rejected call changes nothing.
    pub fn nominate(
        &mut self,
        agent: &Agent,
        bpm: Option<u16>,
        key: Option<(Key, ScaleMode)>,
        reasoning: &str,
        now: Millis,
    ) -> Result<(), CoreError> {
        if self.state.phase != RitualPhase::Nominate {
            return Err(CoreError::NotInNominatePhase);
        }
        if bpm.is_none() && key.is_none() {
            return Err(CoreError::BpmOrKeyRequired);
        }
        if let Some(bpm) = bpm {
            if self
                .state
                .bpm_nominations
                .iter()
                .any(|n| n.nominated_by_agent_id == agent.id)
            {
                return Err(CoreError::AlreadyNominatedBpm);
            }
            if !(BPM_MIN..=BPM_MAX).contains(&bpm) {
                return Err(CoreError::ValidationFailed {
                    details: vec![format!("bpm must be between {} and {}", BPM_MIN, BPM_MAX)],
                });
            }
        }
        if key.is_some()
            && self
                .state
                .key_nominations
                .iter()
                .any(|n| n.nominated_by_agent_id == agent.id)
        {
            return Err(CoreError::AlreadyNominatedKey);
        }

        if let Some(bpm) = bpm {
            self.state.bpm_nominations.push(BpmNomination {
                bpm,
                nominated_by_agent_id: agent.id.clone(),
                nominated_by: agent.name.clone(),
                reasoning: reasoning.to_string(),
                submitted_at: now,
            });
        }
        if let Some((key, scale)) = key {
            self.state.key_nominations.push(KeyNomination {
                key,
                scale,
                nominated_by_agent_id: agent.id.clone(),
                nominated_by: agent.name.clone(),
                reasoning: reasoning.to_string(),
                submitted_at: now,
            });
        }
        Ok(())
    }

    /// Tally nominations into candidates (top 3 per track, by count then
    /// earliest submission). A track with fewer than 2 unique candidates
    /// does not qualify and keeps an empty list.
    pub fn tally(&mut self) {
        let mut bpm_groups: Vec<(u16, u32, Millis, &BpmNomination)> = Vec::new();
        for nomination in &self.state.bpm_nominations {
            match bpm_groups.iter_mut().find(|(v, ..)| *v == nomination.bpm) {
                Some((_, count, earliest, first)) => {
                    *count += 1;
                    if nomination.submitted_at < *earliest {
                        *earliest = nomination.submitted_at;
                        *first = nomination;
                    }
                }
                None => bpm_groups.push((nomination.bpm, 1, nomination.submitted_at, nomination)),
            }
        }
        bpm_groups.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        let bpm_candidates: Vec<BpmCandidate> = bpm_groups
            .iter()
            .take(MAX_CANDIDATES)
            .enumerate()
            .map(|(i, (bpm, count, _, first))| BpmCandidate {
                index: i + 1,
                bpm: *bpm,
                count: *count,
                nominated_by_agent_id: first.nominated_by_agent_id.clone(),
                nominated_by: first.nominated_by.clone(),
            })
            .collect();

        let mut key_groups: Vec<((Key, ScaleMode), u32, Millis, &KeyNomination)> = Vec::new();
        for nomination in &self.state.key_nominations {
            let value = (nomination.key, nomination.scale);
            match key_groups.iter_mut().find(|(v, ..)| *v == value) {
                Some((_, count, earliest, first)) => {
                    *count += 1;
                    if nomination.submitted_at < *earliest {
                        *earliest = nomination.submitted_at;
                        *first = nomination;
                    }
                }
                None => key_groups.push((value, 1, nomination.submitted_at, nomination)),
            }
        }
        key_groups.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        let key_candidates: Vec<KeyCandidate> = key_groups
            .iter()
            .take(MAX_CANDIDATES)
            .enumerate()
            .map(|(i, ((key, scale), count, _, first))| KeyCandidate {
                index: i + 1,
                key: *key,
                scale: *scale,
                count: *count,
                nominated_by_agent_id: first.nominated_by_agent_id.clone(),
                nominated_by: first.nominated_by.clone(),
            })
            .collect();

        self.state.bpm_candidates = if bpm_candidates.len() >= 2 {
            bpm_candidates
        } else {
            Vec::new()
        };
        self.state.key_candidates = if key_candidates.len() >= 2 {
            key_candidates
        } else {
            Vec::new()
        };
    }

    /// Whether the tally produced anything to vote on.
    pub fn has_candidates(&self) -> bool {
        !self.state.bpm_candidates.is_empty() || !self.state.key_candidates.is_empty()
    }

    /// Submit votes for one or both tracks. Validates everything before
    /// mutating.
    pub fn vote(
        &mut self,
        agent: &Agent,
        bpm_index: Option<usize>,
        key_index: Option<usize>,
        now: Millis,
    ) -> Result<(), CoreError> {
        if self.state.phase != RitualPhase::Vote {
            return Err(CoreError::NotInVotePhase);
        }
        if bpm_index.is_none() && key_index.is_none() {
            return Err(CoreError::BpmOrKeyRequired);
        }

        if let Some(index) = bpm_index {
            if self
                .state
                .bpm_votes
                .iter()
                .any(|v| v.voter_agent_id == agent.id)
            {
                return Err(CoreError::AlreadyVotedBpm);
            }
            let candidate = self
                .state
                .bpm_candidates
                .iter()
                .find(|c| c.index == index)
                .ok_or(CoreError::InvalidBpmCandidate)?;
            if candidate.nominated_by_agent_id == agent.id {
                return Err(CoreError::CannotVoteOwnBpm);
            }
        }
        if let Some(index) = key_index {
            if self
                .state
                .key_votes
                .iter()
                .any(|v| v.voter_agent_id == agent.id)
            {
                return Err(CoreError::AlreadyVotedKey);
            }
            let candidate = self
                .state
                .key_candidates
                .iter()
                .find(|c| c.index == index)
                .ok_or(CoreError::InvalidKeyCandidate)?;
            if candidate.nominated_by_agent_id == agent.id {
                return Err(CoreError::CannotVoteOwnKey);
            }
        }

        if let Some(index) = bpm_index {
            self.state.bpm_votes.push(Vote {
                voter_agent_id: agent.id.clone(),
                candidate_index: index,
                at: now,
            });
        }
        if let Some(index) = key_index {
            self.state.key_votes.push(Vote {
                voter_agent_id: agent.id.clone(),
                candidate_index: index,
                at: now,
            });
        }
        Ok(())
    }

    /// Winning BPM candidate, if the track received any votes. Ties break
    /// toward the lower candidate index.
    pub fn bpm_vote_winner(&self) -> Option<&BpmCandidate> {
        winner_index(&self.state.bpm_votes, self.state.bpm_candidates.len())
            .and_then(|i| self.state.bpm_candidates.iter().find(|c| c.index == i))
    }

    /// Winning key candidate, if the track received any votes.
    pub fn key_vote_winner(&self) -> Option<&KeyCandidate> {
        winner_index(&self.state.key_votes, self.state.key_candidates.len())
            .and_then(|i| self.state.key_candidates.iter().find(|c| c.index == i))
    }

    /// The view tailored to a requesting agent (or an anonymous reader).
    pub fn view(&self, agent_id: Option<&AgentId>, now: Millis) -> RitualView {
        let remaining = if self.state.phase == RitualPhase::Idle {
            0
        } else {
            self.state.phase_ends_at.saturating_sub(now) / 1000
        };
        let nominated = |nominations: &[AgentId]| {
            agent_id.is_some_and(|id| nominations.contains(id))
        };
        let bpm_nominators: Vec<AgentId> = self
            .state
            .bpm_nominations
            .iter()
            .map(|n| n.nominated_by_agent_id.clone())
            .collect();
        let key_nominators: Vec<AgentId> = self
            .state
            .key_nominations
            .iter()
            .map(|n| n.nominated_by_agent_id.clone())
            .collect();
        RitualView {
            phase: self.state.phase,
            ritual_number: self.state.ritual_number,
            phase_remaining_seconds: remaining,
            bpm_candidates: self.state.bpm_candidates.iter().map(Into::into).collect(),
            key_candidates: self.state.key_candidates.iter().map(Into::into).collect(),
            has_nominated_bpm: nominated(&bpm_nominators),
            has_nominated_key: nominated(&key_nominators),
            has_voted_bpm: agent_id
                .is_some_and(|id| self.state.bpm_votes.iter().any(|v| &v.voter_agent_id == id)),
            has_voted_key: agent_id
                .is_some_and(|id| self.state.key_votes.iter().any(|v| &v.voter_agent_id == id)),
            bpm_winner: self.state.bpm_winner,
            key_winner: self.state.key_winner,
        }
    }

    pub fn reset(&mut self, now: Millis, interval_ms: u64) {
        *self = Self::new(now, interval_ms);
    }
}

fn idle_state(ritual_number: u64, now: Millis) -> RitualState {
    RitualState {
        id: ids::new_ritual_id(),
        phase: RitualPhase::Idle,
        phase_started_at: now,
        phase_ends_at: now,
        ritual_number,
        bpm_nominations: Vec::new(),
        key_nominations: Vec::new(),
        bpm_candidates: Vec::new(),
        key_candidates: Vec::new(),
        bpm_votes: Vec::new(),
        key_votes: Vec::new(),
        bpm_winner: None,
        key_winner: None,
        previous_epoch: None,
    }
}

/// Highest-voted candidate index; votes desc, then candidate index asc.
fn winner_index(votes: &[Vote], candidate_count: usize) -> Option<usize> {
    if votes.is_empty() || candidate_count == 0 {
        return None;
    }
    let mut counts: Vec<(usize, usize)> = (1..=candidate_count).map(|i| (i, 0)).collect();
    for vote in votes {
        if let Some(entry) = counts.iter_mut().find(|(i, _)| *i == vote.candidate_index) {
            entry.1 += 1;
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    counts.first().map(|(i, _)| *i)
}
