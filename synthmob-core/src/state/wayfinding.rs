//! Continuous-space wayfinding with time-based arrival.
//!
//! Movement stores absolute start/completion timestamps; whether an agent
//! is moving is derived from `now` at read time. The background tick only
//! exists to finalize stored positions and emit arrival events; queries
//! between ticks compute arrival positions lazily.

use std::collections::{HashMap, VecDeque};

use rand::Rng;

use synthmob_types::wayfinding::{
    EVENTS_PER_READ, EVENT_RING_CAPACITY, HOLD_SECONDS_MAX, HOLD_SECONDS_MIN, MIN_MOVE_DISTANCE,
    PRESENCE_DURATION_MAX, PRESENCE_DURATION_MIN, REASON_MAX_LEN,
};
use synthmob_types::{
    ActionOutcome, Agent, AgentId, AgentPositionView, CoreError, LocomotionState, Millis,
    PresenceState, SystemState, WayfindingAction, WayfindingEvent, WayfindingPolicy,
    WayfindingView, ARENA_RADIUS, MOVE_SPEED,
};

/// Full positional record for one agent.
pub struct AgentNav {
    pub agent_id: AgentId,
    pub bot_name: String,
    pub x: f64,
    pub z: f64,
    pub locomotion: LocomotionState,
    pub presence: PresenceState,
    pub system: SystemState,
    pub presence_until: Option<Millis>,
    pub hold_until: Option<Millis>,
    pub movement_from: Option<(f64, f64)>,
    pub movement_to: Option<(f64, f64)>,
    pub movement_started_at: Option<Millis>,
    pub movement_completes_at: Option<Millis>,
    pub travel_seconds: f64,
    pub updated_at: Millis,
}

impl AgentNav {
    /// Moving iff a completion time exists and is in the future.
    pub fn is_moving(&self, now: Millis) -> bool {
        self.movement_completes_at.is_some_and(|c| c > now)
    }

    /// Arrived but not yet finalized by the tick.
    fn arrival_pending(&self, now: Millis) -> bool {
        self.movement_completes_at.is_some_and(|c| c <= now)
    }

    /// Position as seen by readers: the destination once the completion
    /// time has passed, the start point while still traveling.
    fn view_position(&self, now: Millis) -> (f64, f64) {
        if self.arrival_pending(now) {
            self.movement_to.unwrap_or((self.x, self.z))
        } else {
            (self.x, self.z)
        }
    }

    /// Presence as seen by readers, with expiry and posture rules applied.
    fn effective_presence(&self, now: Millis) -> PresenceState {
        let presence = match self.presence_until {
            Some(until) if until <= now => PresenceState::IdlePose,
            _ => self.presence,
        };
        if self.system != SystemState::Normal && !presence.allowed_under_degraded() {
            PresenceState::Rest
        } else {
            presence
        }
    }
}

pub struct WayfindingStore {
    navs: HashMap<AgentId, AgentNav>,
    order: Vec<AgentId>,
    events: VecDeque<WayfindingEvent>,
    next_event_id: u64,
}

impl WayfindingStore {
    pub fn new() -> Self {
        Self {
            navs: HashMap::new(),
            order: Vec::new(),
            events: VecDeque::new(),
            next_event_id: 1,
        }
    }

    pub fn nav(&self, agent_id: &AgentId) -> Option<&AgentNav> {
        self.navs.get(agent_id)
    }

    /// Spawn state for an agent if absent: uniform over the arena disk
    /// (radius scaled by the square root of a uniform draw).
    pub fn ensure(&mut self, agent: &Agent, now: Millis) {
        if self.navs.contains_key(&agent.id) {
            return;
        }
        let mut rng = rand::thread_rng();
        let radius = ARENA_RADIUS * rng.gen_range(0.0f64..1.0).sqrt();
        let angle = rng.gen_range(0.0..std::f64::consts::TAU);
        self.navs.insert(
            agent.id.clone(),
            AgentNav {
                agent_id: agent.id.clone(),
                bot_name: agent.name.clone(),
                x: radius * angle.cos(),
                z: radius * angle.sin(),
                locomotion: LocomotionState::Idle,
                presence: PresenceState::IdlePose,
                system: SystemState::Normal,
                presence_until: None,
                hold_until: None,
                movement_from: None,
                movement_to: None,
                movement_started_at: None,
                movement_completes_at: None,
                travel_seconds: 0.0,
                updated_at: now,
            },
        );
        self.order.push(agent.id.clone());
    }

    fn push_event(&mut self, mut event: WayfindingEvent) -> WayfindingEvent {
        event.event_id = self.next_event_id;
        self.next_event_id += 1;
        if self.events.len() >= EVENT_RING_CAPACITY {
            self.events.pop_front();
        }
        self.events.push_back(event.clone());
        event
    }

    /// Last N events, oldest first.
    pub fn recent_events(&self) -> Vec<WayfindingEvent> {
        self.events
            .iter()
            .rev()
            .take(EVENTS_PER_READ)
            .rev()
            .cloned()
            .collect()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Finalize every completed movement: snap to the destination, clear
    /// the movement fields, and record an arrival event. Returns the
    /// arrival events for publication.
    pub fn tick(&mut self, now: Millis) -> Vec<WayfindingEvent> {
        let mut arrivals = Vec::new();
        let ids: Vec<AgentId> = self.order.clone();
        for id in ids {
            let Some(nav) = self.navs.get_mut(&id) else { continue };
            if !nav.arrival_pending(now) {
                continue;
            }
            if let Some(event) = finalize_nav(nav, now) {
                arrivals.push(self.push_event(event));
            }
        }
        arrivals
    }

    /// Apply read-time guardrails to the requesting agent's stored state:
    /// expired presence collapses to idle, and a degraded posture forces
    /// the presence into its allowed set.
    fn apply_guardrails(&mut self, agent_id: &AgentId, now: Millis) {
        let Some(nav) = self.navs.get_mut(agent_id) else { return };
        if nav.presence_until.is_some_and(|until| until <= now) {
            nav.presence = PresenceState::IdlePose;
            nav.presence_until = None;
        }
        if nav.system != SystemState::Normal && !nav.presence.allowed_under_degraded() {
            nav.presence = PresenceState::Rest;
        }
        if nav.hold_until.is_some_and(|until| until <= now) {
            nav.hold_until = None;
        }
    }

    fn self_view(nav: &AgentNav, now: Millis) -> AgentPositionView {
        let (x, z) = nav.view_position(now);
        let moving = nav.is_moving(now);
        let progress = match (nav.movement_started_at, nav.movement_completes_at) {
            (Some(start), Some(end)) if moving && end > start => {
                Some((100.0 * (now.saturating_sub(start)) as f64 / (end - start) as f64).clamp(0.0, 100.0))
            }
            _ => None,
        };
        AgentPositionView {
            agent_id: nav.agent_id.clone(),
            bot_name: nav.bot_name.clone(),
            x,
            z,
            locomotion_state: if moving {
                LocomotionState::Moving
            } else {
                LocomotionState::Idle
            },
            presence_state: nav.effective_presence(now),
            system_state: nav.system,
            movement_to: if moving { nav.movement_to } else { None },
            movement_progress_pct: progress,
            movement_completes_at: if moving { nav.movement_completes_at } else { None },
            travel_seconds: if moving { Some(nav.travel_seconds) } else { None },
            presence_until: nav.presence_until,
            hold_until: nav.hold_until,
        }
    }

    fn light_view(nav: &AgentNav, now: Millis) -> AgentPositionView {
        let (x, z) = nav.view_position(now);
        AgentPositionView {
            agent_id: nav.agent_id.clone(),
            bot_name: nav.bot_name.clone(),
            x,
            z,
            locomotion_state: if nav.is_moving(now) {
                LocomotionState::Moving
            } else {
                LocomotionState::Idle
            },
            presence_state: nav.effective_presence(now),
            system_state: nav.system,
            movement_to: None,
            movement_progress_pct: None,
            movement_completes_at: None,
            travel_seconds: None,
            presence_until: None,
            hold_until: None,
        }
    }

    /// Full state read for one agent.
    pub fn view(&mut self, agent_id: &AgentId, now: Millis) -> Option<WayfindingView> {
        self.apply_guardrails(agent_id, now);
        let nav = self.navs.get(agent_id)?;
        let self_view = Self::self_view(nav, now);
        let others = self
            .order
            .iter()
            .filter(|id| *id != agent_id)
            .filter_map(|id| self.navs.get(id))
            .map(|nav| Self::light_view(nav, now))
            .collect();
        Some(WayfindingView {
            self_view,
            others,
            policy: WayfindingPolicy::default(),
            recent_events: self.recent_events(),
        })
    }

    /// Submit an action. Returns the outcome (accepted or a reason code)
    /// plus any events to publish on the bus, in order.
    pub fn submit(
        &mut self,
        agent_id: &AgentId,
        action: &WayfindingAction,
        now: Millis,
    ) -> (ActionOutcome, Vec<WayfindingEvent>) {
        let result = self.apply_action(agent_id, action, now);
        let (reason_code, events) = match result {
            Ok(events) => (None, events),
            Err(e) => (Some(e.code().to_string()), Vec::new()),
        };
        let state = self
            .view(agent_id, now)
            .unwrap_or_else(|| WayfindingView {
                self_view: AgentPositionView {
                    agent_id: agent_id.clone(),
                    bot_name: String::new(),
                    x: 0.0,
                    z: 0.0,
                    locomotion_state: LocomotionState::Idle,
                    presence_state: PresenceState::IdlePose,
                    system_state: SystemState::Normal,
                    movement_to: None,
                    movement_progress_pct: None,
                    movement_completes_at: None,
                    travel_seconds: None,
                    presence_until: None,
                    hold_until: None,
                },
                others: Vec::new(),
                policy: WayfindingPolicy::default(),
                recent_events: Vec::new(),
            });
        (
            ActionOutcome {
                accepted: reason_code.is_none(),
                reason_code,
                state,
            },
            events,
        )
    }

    fn apply_action(
        &mut self,
        agent_id: &AgentId,
        action: &WayfindingAction,
        now: Millis,
    ) -> Result<Vec<WayfindingEvent>, CoreError> {
        if action.is_legacy() {
            return Err(CoreError::LegacyActionUnsupported);
        }
        if let Some(reason) = action.reason() {
            if reason.is_empty() || reason.chars().count() > REASON_MAX_LEN {
                return Err(CoreError::InvalidReason);
            }
        }
        self.apply_guardrails(agent_id, now);

        match action {
            WayfindingAction::MoveTo { x, z, .. } => self.move_to(agent_id, *x, *z, now),
            WayfindingAction::HoldPosition { hold_seconds, .. } => {
                if !(HOLD_SECONDS_MIN..=HOLD_SECONDS_MAX).contains(hold_seconds) {
                    return Err(CoreError::InvalidHoldSeconds);
                }
                let nav = self.navs.get_mut(agent_id).ok_or(CoreError::Unauthorized)?;
                if nav.is_moving(now) {
                    return Err(CoreError::MovementInProgress);
                }
                nav.hold_until = Some(now + u64::from(*hold_seconds) * 1000);
                nav.updated_at = now;
                Ok(Vec::new())
            }
            WayfindingAction::SetPresenceState {
                state,
                duration_sec,
                ..
            } => {
                if let Some(d) = duration_sec {
                    if !(PRESENCE_DURATION_MIN..=PRESENCE_DURATION_MAX).contains(d) {
                        return Err(CoreError::PresenceDurationTooLong);
                    }
                }
                let nav = self.navs.get_mut(agent_id).ok_or(CoreError::Unauthorized)?;
                if nav.system != SystemState::Normal && !state.allowed_under_degraded() {
                    return Err(CoreError::PresenceStateDisallowed);
                }
                nav.presence = *state;
                nav.presence_until = duration_sec.map(|d| now + u64::from(d) * 1000);
                nav.updated_at = now;
                let event = self.push_event(WayfindingEvent {
                    event_id: 0,
                    at: now,
                    bot_name: self.navs[agent_id].bot_name.clone(),
                    event_type: "bot_presence_changed".to_string(),
                    from_x: None,
                    from_z: None,
                    to_x: None,
                    to_z: None,
                    reason_code: Some(state.as_str().to_string()),
                    travel_seconds: None,
                    completes_at: self.navs[agent_id].presence_until,
                });
                Ok(vec![event])
            }
            WayfindingAction::ClearPresenceState { .. } => {
                let nav = self.navs.get_mut(agent_id).ok_or(CoreError::Unauthorized)?;
                nav.presence = PresenceState::IdlePose;
                nav.presence_until = None;
                nav.updated_at = now;
                Ok(Vec::new())
            }
            WayfindingAction::SetSystemState { state, .. } => {
                if *state == SystemState::Suspended {
                    return Err(CoreError::SystemStateDisallowed);
                }
                let nav = self.navs.get_mut(agent_id).ok_or(CoreError::Unauthorized)?;
                nav.system = *state;
                if *state != SystemState::Normal {
                    nav.presence = PresenceState::Rest;
                }
                nav.updated_at = now;
                Ok(Vec::new())
            }
            WayfindingAction::ClearSystemState { .. } => {
                let nav = self.navs.get_mut(agent_id).ok_or(CoreError::Unauthorized)?;
                nav.system = SystemState::Normal;
                nav.updated_at = now;
                Ok(Vec::new())
            }
            _ => Err(CoreError::LegacyActionUnsupported),
        }
    }

    fn move_to(
        &mut self,
        agent_id: &AgentId,
        x: f64,
        z: f64,
        now: Millis,
    ) -> Result<Vec<WayfindingEvent>, CoreError> {
        // Finalize a lapsed movement first so `from` is the true position.
        let mut finalized = None;
        {
            let nav = self.navs.get_mut(agent_id).ok_or(CoreError::Unauthorized)?;
            if nav.is_moving(now) {
                return Err(CoreError::MovementInProgress);
            }
            if nav.arrival_pending(now) {
                finalized = finalize_nav(nav, now);
            }
        }
        let mut events = Vec::new();
        if let Some(event) = finalized {
            events.push(self.push_event(event));
        }

        let nav = self.navs.get_mut(agent_id).ok_or(CoreError::Unauthorized)?;

        // Project targets outside the arena back onto the disk edge.
        let (mut tx, mut tz) = (x, z);
        let norm = (tx * tx + tz * tz).sqrt();
        if norm > ARENA_RADIUS {
            let scale = ARENA_RADIUS / norm;
            tx *= scale;
            tz *= scale;
        }

        let distance = ((tx - nav.x).powi(2) + (tz - nav.z).powi(2)).sqrt();
        if distance < MIN_MOVE_DISTANCE {
            return Err(CoreError::AlreadyAtDestination);
        }

        let travel_seconds = distance / MOVE_SPEED;
        let completes_at = now + (travel_seconds * 1000.0).round() as Millis;
        nav.movement_from = Some((nav.x, nav.z));
        nav.movement_to = Some((tx, tz));
        nav.movement_started_at = Some(now);
        nav.movement_completes_at = Some(completes_at);
        nav.travel_seconds = travel_seconds;
        nav.locomotion = LocomotionState::Moving;
        nav.updated_at = now;

        let (from_x, from_z) = nav.movement_from.unwrap_or((0.0, 0.0));
        let bot_name = nav.bot_name.clone();
        let event = self.push_event(WayfindingEvent {
            event_id: 0,
            at: now,
            bot_name,
            event_type: "bot_nav_path_started".to_string(),
            from_x: Some(from_x),
            from_z: Some(from_z),
            to_x: Some(tx),
            to_z: Some(tz),
            reason_code: None,
            travel_seconds: Some(travel_seconds),
            completes_at: Some(completes_at),
        });
        events.push(event);
        Ok(events)
    }

    pub fn clear(&mut self) {
        self.navs.clear();
        self.order.clear();
        self.events.clear();
        self.next_event_id = 1;
    }
}

impl Default for WayfindingStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Snap a completed movement into place and build the arrival event.
fn finalize_nav(nav: &mut AgentNav, now: Millis) -> Option<WayfindingEvent> {
    let (to_x, to_z) = nav.movement_to?;
    let (from_x, from_z) = nav.movement_from.unwrap_or((nav.x, nav.z));
    nav.x = to_x;
    nav.z = to_z;
    nav.movement_from = None;
    nav.movement_to = None;
    nav.movement_started_at = None;
    nav.movement_completes_at = None;
    nav.travel_seconds = 0.0;
    nav.locomotion = LocomotionState::Idle;
    nav.updated_at = now;
    Some(WayfindingEvent {
        event_id: 0,
        at: now,
        bot_name: nav.bot_name.clone(),
        event_type: "bot_nav_arrived".to_string(),
        from_x: Some(from_x),
        from_z: Some(from_z),
        to_x: Some(to_x),
        to_z: Some(to_z),
        reason_code: None,
        travel_seconds: None,
        completes_at: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(name: &str) -> Agent {
        Agent {
            id: AgentId(format!("agt_{}", name)),
            name: name.to_string(),
            token: "t".repeat(64),
            created_at: 0,
            total_placements: 0,
            reputation: 0,
            owner_address: None,
        }
    }

    fn store_with(agent: &Agent) -> WayfindingStore {
        let mut store = WayfindingStore::new();
        store.ensure(agent, 0);
        // Pin the spawn so travel math is deterministic.
        let nav = store.navs.get_mut(&agent.id).unwrap();
        nav.x = 0.0;
        nav.z = 0.0;
        store
    }

    fn move_to(x: f64, z: f64) -> WayfindingAction {
        WayfindingAction::MoveTo {
            x,
            z,
            reason: "test".to_string(),
        }
    }

    #[test]
    fn spawn_is_inside_the_arena()  {
        let mut store = WayfindingStore::new();
        for i in 0..50 {
            let a = agent(&format!("a{}", i));
            store.ensure(&a, 0);
            let nav = store.nav(&a.id).unwrap();
            assert!((nav.x * nav.x + nav.z * nav.z).sqrt() <= ARENA_RADIUS + 1e-9);
        }
    }

    #[test]
    fn move_is_clamped_to_arena_and_timed() {
        let w = agent("w");
        let mut store = store_with(&w);
        let (outcome, events) = store.submit(&w.id, &move_to(100.0, 0.0), 0);
        assert!(outcome.accepted);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "bot_nav_path_started");
        assert_eq!(events[0].to_x, Some(50.0));
        assert_eq!(events[0].travel_seconds, Some(12.5));

        let nav = store.nav(&w.id).unwrap();
        assert_eq!(nav.movement_completes_at, Some(12_500));
        assert!(nav.is_moving(1));
    }

    #[test]
    fn second_move_while_traveling_is_rejected() {
        let w = agent("w");
        let mut store = store_with(&w);
        store.submit(&w.id, &move_to(40.0, 0.0), 0);
        let (outcome, _) = store.submit(&w.id, &move_to(0.0, 40.0), 1_000);
        assert!(!outcome.accepted);
        assert_eq!(outcome.reason_code.as_deref(), Some("movement_in_progress"));
    }

    #[test]
    fn min_distance_boundary() {
        let w = agent("w");
        let mut store = store_with(&w);
        let (outcome, _) = store.submit(&w.id, &move_to(0.09, 0.0), 0);
        assert_eq!(outcome.reason_code.as_deref(), Some("already_at_destination"));
        let (outcome, _) = store.submit(&w.id, &move_to(0.11, 0.0), 0);
        assert!(outcome.accepted);
    }

    #[test]
    fn tick_finalizes_and_emits_arrival() {
        let w = agent("w");
        let mut store = store_with(&w);
        store.submit(&w.id, &move_to(40.0, 0.0), 0); // 10s travel

        // Before completion the stored position is the start.
        assert!(store.tick(9_000).is_empty());
        assert_eq!(store.nav(&w.id).unwrap().x, 0.0);

        let arrivals = store.tick(10_001);
        assert_eq!(arrivals.len(), 1);
        assert_eq!(arrivals[0].event_type, "bot_nav_arrived");
        assert_eq!(arrivals[0].to_x, Some(40.0));
        let nav = store.nav(&w.id).unwrap();
        assert_eq!((nav.x, nav.z), (40.0, 0.0));
        assert_eq!(nav.locomotion, LocomotionState::Idle);
        assert!(nav.movement_completes_at.is_none());
    }

    #[test]
    fn reads_between_ticks_see_the_arrival_lazily() {
        let w = agent("w");
        let mut store = store_with(&w);
        store.submit(&w.id, &move_to(40.0, 0.0), 0);

        // Past completion, before any tick: view shows the destination,
        // stored state still holds the start.
        let view = store.view(&w.id, 10_100).unwrap();
        assert_eq!(view.self_view.x, 40.0);
        assert_eq!(view.self_view.locomotion_state, LocomotionState::Idle);
        assert_eq!(store.nav(&w.id).unwrap().x, 0.0);
    }

    #[test]
    fn progress_pct_interpolates() {
        let w = agent("w");
        let mut store = store_with(&w);
        store.submit(&w.id, &move_to(40.0, 0.0), 0); // completes at 10s
        let view = store.view(&w.id, 5_000).unwrap();
        let pct = view.self_view.movement_progress_pct.unwrap();
        assert!((pct - 50.0).abs() < 1.0);
    }

    #[test]
    fn hold_position_rules() {
        let w = agent("w");
        let mut store = store_with(&w);
        let hold = |s| WayfindingAction::HoldPosition {
            hold_seconds: s,
            reason: None,
        };
        let (outcome, _) = store.submit(&w.id, &hold(0), 0);
        assert_eq!(outcome.reason_code.as_deref(), Some("invalid_hold_seconds"));
        let (outcome, _) = store.submit(&w.id, &hold(31), 0);
        assert_eq!(outcome.reason_code.as_deref(), Some("invalid_hold_seconds"));
        let (outcome, _) = store.submit(&w.id, &hold(10), 0);
        assert!(outcome.accepted);
        assert_eq!(store.nav(&w.id).unwrap().hold_until, Some(10_000));

        store.submit(&w.id, &move_to(40.0, 0.0), 20_000);
        let (outcome, _) = store.submit(&w.id, &hold(5), 21_000);
        assert_eq!(outcome.reason_code.as_deref(), Some("movement_in_progress"));
    }

    #[test]
    fn presence_duration_bounds() {
        let w = agent("w");
        let mut store = store_with(&w);
        let set = |d| WayfindingAction::SetPresenceState {
            state: PresenceState::Dancing,
            duration_sec: d,
            reason: None,
        };
        let (outcome, _) = store.submit(&w.id, &set(Some(0)), 0);
        assert_eq!(
            outcome.reason_code.as_deref(),
            Some("presence_duration_too_long")
        );
        let (outcome, _) = store.submit(&w.id, &set(Some(301)), 0);
        assert_eq!(
            outcome.reason_code.as_deref(),
            Some("presence_duration_too_long")
        );
        let (outcome, events) = store.submit(&w.id, &set(Some(300)), 0);
        assert!(outcome.accepted);
        assert_eq!(events[0].event_type, "bot_presence_changed");
        assert_eq!(store.nav(&w.id).unwrap().presence_until, Some(300_000));
    }

    #[test]
    fn presence_expires_on_read() {
        let w = agent("w");
        let mut store = store_with(&w);
        store.submit(
            &w.id,
            &WayfindingAction::SetPresenceState {
                state: PresenceState::Spin,
                duration_sec: Some(5),
                reason: None,
            },
            0,
        );
        let view = store.view(&w.id, 6_000).unwrap();
        assert_eq!(view.self_view.presence_state, PresenceState::IdlePose);
        assert!(store.nav(&w.id).unwrap().presence_until.is_none());
    }

    #[test]
    fn degraded_posture_restricts_presence() {
        let w = agent("w");
        let mut store = store_with(&w);
        store.submit(
            &w.id,
            &WayfindingAction::SetSystemState {
                state: SystemState::RateLimited,
                reason: None,
            },
            0,
        );
        // Setting a non-normal system state forces rest.
        assert_eq!(store.nav(&w.id).unwrap().presence, PresenceState::Rest);

        let (outcome, _) = store.submit(
            &w.id,
            &WayfindingAction::SetPresenceState {
                state: PresenceState::Dancing,
                duration_sec: None,
                reason: None,
            },
            1,
        );
        assert_eq!(
            outcome.reason_code.as_deref(),
            Some("presence_state_disallowed")
        );

        // idle_pose and rest are still allowed.
        let (outcome, _) = store.submit(
            &w.id,
            &WayfindingAction::SetPresenceState {
                state: PresenceState::IdlePose,
                duration_sec: None,
                reason: None,
            },
            2,
        );
        assert!(outcome.accepted);

        store.submit(&w.id, &WayfindingAction::ClearSystemState { reason: None }, 3);
        assert_eq!(store.nav(&w.id).unwrap().system, SystemState::Normal);
    }

    #[test]
    fn suspended_cannot_be_set_via_actions() {
        let w = agent("w");
        let mut store = store_with(&w);
        let (outcome, _) = store.submit(
            &w.id,
            &WayfindingAction::SetSystemState {
                state: SystemState::Suspended,
                reason: None,
            },
            0,
        );
        assert_eq!(
            outcome.reason_code.as_deref(),
            Some("system_state_disallowed")
        );
    }

    #[test]
    fn legacy_actions_get_a_distinguishing_code() {
        let w = agent("w");
        let mut store = store_with(&w);
        let (outcome, _) = store.submit(&w.id, &WayfindingAction::JoinSlotQueue {}, 0);
        assert_eq!(
            outcome.reason_code.as_deref(),
            Some("legacy_action_unsupported")
        );
    }

    #[test]
    fn reason_bounds() {
        let w = agent("w");
        let mut store = store_with(&w);
        let (outcome, _) = store.submit(
            &w.id,
            &WayfindingAction::MoveTo {
                x: 10.0,
                z: 0.0,
                reason: String::new(),
            },
            0,
        );
        assert_eq!(outcome.reason_code.as_deref(), Some("invalid_reason"));
        let (outcome, _) = store.submit(
            &w.id,
            &WayfindingAction::MoveTo {
                x: 10.0,
                z: 0.0,
                reason: "r".repeat(281),
            },
            0,
        );
        assert_eq!(outcome.reason_code.as_deref(), Some("invalid_reason"));
    }

    #[test]
    fn event_ring_is_capped_and_reads_return_twelve() {
        let w = agent("w");
        let mut store = store_with(&w);
        for i in 0..(EVENT_RING_CAPACITY + 40) {
            store.submit(
                &w.id,
                &WayfindingAction::SetPresenceState {
                    state: PresenceState::Clap,
                    duration_sec: None,
                    reason: None,
                },
                i as Millis,
            );
        }
        assert_eq!(store.event_count(), EVENT_RING_CAPACITY);
        let recent = store.recent_events();
        assert_eq!(recent.len(), EVENTS_PER_READ);
        // Oldest first, ending at the newest event.
        assert!(recent[0].event_id < recent[EVENTS_PER_READ - 1].event_id);
    }

    #[test]
    fn move_from_lapsed_arrival_finalizes_first() {
        let w = agent("w");
        let mut store = store_with(&w);
        store.submit(&w.id, &move_to(40.0, 0.0), 0); // completes at 10s

        // New move after completion but before any tick: arrival is
        // finalized (and its event emitted) before the new path starts.
        let (outcome, events) = store.submit(&w.id, &move_to(0.0, 40.0), 11_000);
        assert!(outcome.accepted);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "bot_nav_arrived");
        assert_eq!(events[1].event_type, "bot_nav_path_started");
        assert_eq!(events[1].from_x, Some(40.0));

        // The tick must not double-emit that arrival.
        assert!(store.tick(11_500).is_empty());
    }
}
