//! Collaborative session lifecycle.

use rand::Rng;

use synthmob_types::session::{
    MAX_TITLE_LEN, SPAWN_RADIUS_MAX, SPAWN_RADIUS_MIN, STAGE_EXCLUSION_RADIUS, STAGE_PUSH_RADIUS,
};
use synthmob_types::{
    Agent, AgentId, AgentPublic, CoreError, Millis, Participant, Session, SessionId,
    SessionPosition, SessionRole, SessionType, MAX_SESSIONS,
};

use crate::ids;

pub struct SessionStore {
    sessions: Vec<Session>,
}

/// Result of a start: `created` is false when the agent was already in a
/// session and got it back unchanged.
#[derive(Debug)]
pub struct StartOutcome {
    pub session: Session,
    pub created: bool,
}

/// Result of a join. `auto_left` reports the session the agent was pulled
/// out of first, if any.
#[derive(Debug)]
pub struct JoinOutcome {
    pub session: Session,
    pub auto_left: Option<LeaveOutcome>,
    pub rejoined: bool,
}

/// Result of a leave. `session` is the surviving session, if any;
/// `promoted` the participant promoted to creator, if any.
#[derive(Debug)]
pub struct LeaveOutcome {
    pub session_id: SessionId,
    pub session_type: SessionType,
    pub ended: bool,
    pub session: Option<Session>,
    pub promoted: Option<AgentPublic>,
}

/// Resolve a session position: random annulus spawn when none is given,
/// then push anything inside the stage exclusion zone radially outward.
pub fn resolve_position(position: Option<(f64, f64)>) -> SessionPosition {
    let mut rng = rand::thread_rng();
    let (mut x, mut z) = position.unwrap_or_else(|| {
        let radius = rng.gen_range(SPAWN_RADIUS_MIN..=SPAWN_RADIUS_MAX);
        let angle = rng.gen_range(0.0..std::f64::consts::TAU);
        (radius * angle.cos(), radius * angle.sin())
    });

    let dist = (x * x + z * z).sqrt();
    if dist < STAGE_EXCLUSION_RADIUS {
        if dist < f64::EPSILON {
            let angle = rng.gen_range(0.0..std::f64::consts::TAU);
            x = STAGE_PUSH_RADIUS * angle.cos();
            z = STAGE_PUSH_RADIUS * angle.sin();
        } else {
            let scale = STAGE_PUSH_RADIUS / dist;
            x *= scale;
            z *= scale;
        }
    }
    SessionPosition::at(x, z)
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Vec::new(),
        }
    }

    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.iter().find(|s| &s.id == id)
    }

    pub fn session_of_agent(&self, agent_id: &AgentId) -> Option<&Session> {
        self.sessions
            .iter()
            .find(|s| s.participant(agent_id).is_some())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Deep copy of all sessions.
    pub fn snapshot(&self) -> Vec<Session> {
        self.sessions.clone()
    }

    /// Deep copy of music-type sessions (the legacy jam view).
    pub fn music_snapshot(&self) -> Vec<Session> {
        self.sessions
            .iter()
            .filter(|s| s.session_type == SessionType::Music)
            .cloned()
            .collect()
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
    }

    /// Start a session. Re-entrant: an agent already in a session gets
    /// that session back unchanged.
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        &mut self,
        agent: &Agent,
        session_type: SessionType,
        title: Option<String>,
        pattern: Option<String>,
        output: Option<serde_json::Value>,
        position: Option<(f64, f64)>,
        now: Millis,
    ) -> Result<StartOutcome, CoreError> {
        if let Some(existing) = self.session_of_agent(&agent.id) {
            return Ok(StartOutcome {
                session: existing.clone(),
                created: false,
            });
        }
        if self.sessions.len() >= MAX_SESSIONS {
            return Err(CoreError::MaxSessionsReached);
        }

        let title = title.map(|t| {
            if t.chars().count() > MAX_TITLE_LEN {
                t.chars().take(MAX_TITLE_LEN).collect()
            } else {
                t
            }
        });

        let session = Session {
            id: ids::new_session_id(),
            session_type,
            title,
            creator_agent_id: agent.id.clone(),
            creator_bot_name: agent.name.clone(),
            position: resolve_position(position),
            created_at: now,
            updated_at: now,
            participants: vec![Participant {
                agent_id: agent.id.clone(),
                bot_name: agent.name.clone(),
                joined_at: now,
                role: SessionRole::Creator,
                pattern,
                output,
            }],
            meta: serde_json::json!({}),
        };
        self.sessions.push(session.clone());
        Ok(StartOutcome {
            session,
            created: true,
        })
    }

    /// Join a session, auto-leaving any other session first. Joining a
    /// session the agent is already in updates their pattern/output.
    pub fn join(
        &mut self,
        agent: &Agent,
        session_id: &SessionId,
        pattern: Option<String>,
        output: Option<serde_json::Value>,
        now: Millis,
    ) -> Result<JoinOutcome, CoreError> {
        if self.get(session_id).is_none() {
            return Err(CoreError::SessionNotFound);
        }

        // Idempotent rejoin: refresh the participant in place.
        let already_here = self
            .get(session_id)
            .is_some_and(|s| s.participant(&agent.id).is_some());
        if already_here {
            let session = self
                .sessions
                .iter_mut()
                .find(|s| &s.id == session_id)
                .ok_or(CoreError::SessionNotFound)?;
            let participant = session
                .participant_mut(&agent.id)
                .ok_or(CoreError::NotInSession)?;
            if pattern.is_some() {
                participant.pattern = pattern;
            }
            if output.is_some() {
                participant.output = output;
            }
            session.updated_at = now;
            return Ok(JoinOutcome {
                session: session.clone(),
                auto_left: None,
                rejoined: true,
            });
        }

        let auto_left = match self.session_of_agent(&agent.id) {
            Some(current) => {
                let current_id = current.id.clone();
                Some(self.leave(&agent.id, Some(&current_id), now)?)
            }
            None => None,
        };

        let session = self
            .sessions
            .iter_mut()
            .find(|s| &s.id == session_id)
            .ok_or(CoreError::SessionNotFound)?;
        session.participants.push(Participant {
            agent_id: agent.id.clone(),
            bot_name: agent.name.clone(),
            joined_at: now,
            role: SessionRole::Contributor,
            pattern,
            output,
        });
        session.updated_at = now;
        Ok(JoinOutcome {
            session: session.clone(),
            auto_left,
            rejoined: false,
        })
    }

    /// Update the caller's pattern/output within a session.
    pub fn update_output(
        &mut self,
        agent_id: &AgentId,
        session_id: &SessionId,
        pattern: Option<String>,
        output: Option<serde_json::Value>,
        now: Millis,
    ) -> Result<Session, CoreError> {
        let session = self
            .sessions
            .iter_mut()
            .find(|s| &s.id == session_id)
            .ok_or(CoreError::SessionNotFound)?;
        let participant = session
            .participant_mut(agent_id)
            .ok_or(CoreError::NotInSession)?;
        if pattern.is_some() {
            participant.pattern = pattern;
        }
        if output.is_some() {
            participant.output = output;
        }
        session.updated_at = now;
        Ok(session.clone())
    }

    /// Leave a session (the agent's current one when no id is given).
    /// Destroys the session when it empties; otherwise promotes the
    /// earliest-joined remaining participant if the creator left.
    pub fn leave(
        &mut self,
        agent_id: &AgentId,
        session_id: Option<&SessionId>,
        now: Millis,
    ) -> Result<LeaveOutcome, CoreError> {
        let index = match session_id {
            Some(id) => {
                let index = self
                    .sessions
                    .iter()
                    .position(|s| &s.id == id)
                    .ok_or(CoreError::SessionNotFound)?;
                if self.sessions[index].participant(agent_id).is_none() {
                    return Err(CoreError::NotInSession);
                }
                index
            }
            None => self
                .sessions
                .iter()
                .position(|s| s.participant(agent_id).is_some())
                .ok_or(CoreError::NotInSession)?,
        };

        let (was_creator, emptied) = {
            let session = &mut self.sessions[index];
            let was_creator = &session.creator_agent_id == agent_id;
            session.participants.retain(|p| &p.agent_id != agent_id);
            session.updated_at = now;
            (was_creator, session.participants.is_empty())
        };

        if emptied {
            let removed = self.sessions.remove(index);
            return Ok(LeaveOutcome {
                session_id: removed.id,
                session_type: removed.session_type,
                ended: true,
                session: None,
                promoted: None,
            });
        }

        let session = &mut self.sessions[index];
        let mut promoted = None;
        if was_creator {
            let earliest = session
                .participants
                .iter_mut()
                .min_by_key(|p| p.joined_at)
                .expect("non-empty participants");
            earliest.role = SessionRole::Creator;
            promoted = Some(AgentPublic {
                id: earliest.agent_id.clone(),
                name: earliest.bot_name.clone(),
            });
            session.creator_agent_id = earliest.agent_id.clone();
            session.creator_bot_name = earliest.bot_name.clone();
        }

        Ok(LeaveOutcome {
            session_id: session.id.clone(),
            session_type: session.session_type,
            ended: false,
            session: Some(session.clone()),
            promoted,
        })
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
