//! The core facade: one lock, one entry point per operation.
//!
//! Every mutating operation acquires the core lock, authenticates,
//! touches presence, validates, mutates the owning store, and publishes
//! its events in order before releasing the lock, so a single
//! subscriber sees a total order across all operations. Reads take the
//! lock only long enough to snapshot; nothing handed out aliases
//! internal state.

use std::sync::Mutex;

use serde::Serialize;
use serde_json::json;

use synthmob_types::event::names;
use synthmob_types::{
    ActionOutcome, Agent, AgentId, AgentMessage, AgentStatus, CoreError, CoreEvent, Directive,
    InstrumentType, Millis, MusicPlacement, OnlineAgent, PlacementId, Position, RitualView,
    SenderType, Session, SessionId, SessionType, Slot, Validation, WayfindingAction,
    WayfindingView, WorldSnapshot,
};

use crate::bus::{EventBus, Subscriber, SubscriberId};
use crate::clock::now_ms;
use crate::config::CoreConfig;
use crate::ops;
use crate::state::CoreState;

struct Inner {
    state: CoreState,
    bus: EventBus,
}

/// Counters returned by an admin reset.
#[derive(Debug, Clone, Serialize)]
pub struct ResetCounters {
    pub agents: usize,
    pub sessions: usize,
    pub placements: usize,
    pub messages: usize,
    pub directives: usize,
    pub reset_count: u64,
}

/// The authoritative core. Cheap to share behind an `Arc`.
pub struct Core {
    inner: Mutex<Inner>,
    config: CoreConfig,
}

impl Core {
    pub fn new(config: CoreConfig) -> Self {
        let now = now_ms();
        Self {
            inner: Mutex::new(Inner {
                state: CoreState::new(now, config.ritual_interval_ms),
                bus: EventBus::new(),
            }),
            config,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("core lock poisoned")
    }

    // ── Subscriptions ───────────────────────────────────────────────

    pub fn subscribe(&self, subscriber: Box<dyn Subscriber>) -> SubscriberId {
        self.lock().bus.subscribe(subscriber)
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.lock().bus.unsubscribe(id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().bus.subscriber_count()
    }

    // ── Agents ──────────────────────────────────────────────────────

    pub fn register_agent(&self, name: &str) -> Result<Agent, CoreError> {
        let now = now_ms();
        let mut inner = self.lock();
        ops::agents::register(&mut inner.state, name, now)
    }

    pub fn agent_status(&self, token: &str) -> Result<AgentStatus, CoreError> {
        let now = now_ms();
        let mut inner = self.lock();
        let agent = authenticate(&inner.state, token)?;
        inner.state.agents.touch(&agent.id, now, None);
        Ok(ops::agents::status(&inner.state, &agent, now))
    }

    pub fn online_agents(&self) -> Vec<OnlineAgent> {
        let inner = self.lock();
        ops::agents::online(&inner.state, now_ms())
    }

    // ── Composition & context ───────────────────────────────────────

    pub fn composition(&self) -> serde_json::Value {
        ops::composition_payload(&self.lock().state)
    }

    pub fn context(&self) -> serde_json::Value {
        ops::context_payload(&self.lock().state, now_ms())
    }

    // ── Slots ───────────────────────────────────────────────────────

    pub fn write_slot(
        &self,
        token: &str,
        slot_id: u8,
        code: &str,
    ) -> Result<(Slot, Validation), CoreError> {
        let now = now_ms();
        let mut inner = self.lock();
        let Inner { state, bus } = &mut *inner;
        let agent = authenticate(state, token)?;
        state
            .agents
            .touch(&agent.id, now, Some(&format!("writing slot {}", slot_id)));
        let (slot, validation, events) = ops::slots::write_slot(state, &agent, slot_id, code, now)?;
        bus.publish_all(&events);
        Ok((slot, validation))
    }

    // ── Music placements ────────────────────────────────────────────

    pub fn placements(&self) -> Vec<MusicPlacement> {
        self.lock().state.placements.snapshot()
    }

    pub fn place_music(
        &self,
        token: &str,
        instrument_type: InstrumentType,
        pattern: &str,
        position: Option<Position>,
    ) -> Result<(MusicPlacement, Validation), CoreError> {
        let now = now_ms();
        let mut inner = self.lock();
        let Inner { state, bus } = &mut *inner;
        let agent = authenticate(state, token)?;
        state.agents.touch(&agent.id, now, Some("placing music"));
        let position = position.unwrap_or(Position { x: 0.0, z: 0.0 });
        let (placement, validation, events) =
            ops::placements::place(state, &agent, instrument_type, pattern, position, now)?;
        bus.publish_all(&events);
        Ok((placement, validation))
    }

    pub fn update_placement(
        &self,
        token: &str,
        placement_id: &PlacementId,
        pattern: &str,
    ) -> Result<(MusicPlacement, Validation), CoreError> {
        let now = now_ms();
        let mut inner = self.lock();
        let Inner { state, bus } = &mut *inner;
        let agent = authenticate(state, token)?;
        state.agents.touch(&agent.id, now, None);
        let (placement, validation, events) =
            ops::placements::update(state, &agent, placement_id, pattern, now)?;
        bus.publish_all(&events);
        Ok((placement, validation))
    }

    pub fn remove_placement(
        &self,
        token: &str,
        placement_id: &PlacementId,
    ) -> Result<(), CoreError> {
        let now = now_ms();
        let mut inner = self.lock();
        let Inner { state, bus } = &mut *inner;
        let agent = authenticate(state, token)?;
        state.agents.touch(&agent.id, now, None);
        let events = ops::placements::remove(state, &agent, placement_id)?;
        bus.publish_all(&events);
        Ok(())
    }

    // ── World ───────────────────────────────────────────────────────

    pub fn world_snapshot(&self) -> WorldSnapshot {
        self.lock().state.world.snapshot()
    }

    pub fn write_world(
        &self,
        token: &str,
        output_json: &str,
    ) -> Result<(WorldSnapshot, Validation), CoreError> {
        let now = now_ms();
        let mut inner = self.lock();
        let Inner { state, bus } = &mut *inner;
        let agent = authenticate(state, token)?;
        state.agents.touch(&agent.id, now, Some("building world"));
        let (snapshot, validation, events) = ops::world::write(state, &agent, output_json, now)?;
        bus.publish_all(&events);
        Ok((snapshot, validation))
    }

    pub fn clear_world(&self, token: &str) -> Result<WorldSnapshot, CoreError> {
        let now = now_ms();
        let mut inner = self.lock();
        let Inner { state, bus } = &mut *inner;
        let agent = authenticate(state, token)?;
        state.agents.touch(&agent.id, now, None);
        let (snapshot, events) = ops::world::clear(state, &agent.id, now);
        bus.publish_all(&events);
        Ok(snapshot)
    }

    // ── Sessions ────────────────────────────────────────────────────

    pub fn sessions(&self) -> Vec<Session> {
        self.lock().state.sessions.snapshot()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn start_session(
        &self,
        token: &str,
        session_type: SessionType,
        title: Option<String>,
        pattern: Option<String>,
        output: Option<serde_json::Value>,
        position: Option<(f64, f64)>,
    ) -> Result<(Session, bool), CoreError> {
        let now = now_ms();
        let mut inner = self.lock();
        let Inner { state, bus } = &mut *inner;
        let agent = authenticate(state, token)?;
        state.agents.touch(&agent.id, now, Some("in session"));
        let result =
            ops::sessions::start(state, &agent, session_type, title, pattern, output, position, now)?;
        bus.publish_all(&result.events);
        Ok((result.session, result.created))
    }

    pub fn join_session(
        &self,
        token: &str,
        session_id: &SessionId,
        pattern: Option<String>,
        output: Option<serde_json::Value>,
    ) -> Result<Session, CoreError> {
        let now = now_ms();
        let mut inner = self.lock();
        let Inner { state, bus } = &mut *inner;
        let agent = authenticate(state, token)?;
        state.agents.touch(&agent.id, now, Some("in session"));
        let (session, events) =
            ops::sessions::join(state, &agent, session_id, pattern, output, now)?;
        bus.publish_all(&events);
        Ok(session)
    }

    pub fn session_output(
        &self,
        token: &str,
        session_id: &SessionId,
        pattern: Option<String>,
        output: Option<serde_json::Value>,
    ) -> Result<Session, CoreError> {
        let now = now_ms();
        let mut inner = self.lock();
        let Inner { state, bus } = &mut *inner;
        let agent = authenticate(state, token)?;
        state.agents.touch(&agent.id, now, Some("in session"));
        let (session, events) =
            ops::sessions::update_output(state, &agent, session_id, pattern, output, now)?;
        bus.publish_all(&events);
        Ok(session)
    }

    pub fn leave_session(
        &self,
        token: &str,
        session_id: Option<&SessionId>,
    ) -> Result<SessionId, CoreError> {
        let now = now_ms();
        let mut inner = self.lock();
        let Inner { state, bus } = &mut *inner;
        let agent = authenticate(state, token)?;
        state.agents.touch(&agent.id, now, None);
        let (session_id, events) = ops::sessions::leave(state, &agent, session_id, now)?;
        bus.publish_all(&events);
        Ok(session_id)
    }

    // ── Wayfinding ──────────────────────────────────────────────────

    pub fn wayfinding_state(&self, token: &str) -> Result<WayfindingView, CoreError> {
        let now = now_ms();
        let mut inner = self.lock();
        let agent = authenticate(&inner.state, token)?;
        inner.state.agents.touch(&agent.id, now, None);
        Ok(ops::wayfinding::get_state(&mut inner.state, &agent, now))
    }

    pub fn wayfinding_action(
        &self,
        token: &str,
        action: &WayfindingAction,
    ) -> Result<ActionOutcome, CoreError> {
        let now = now_ms();
        let mut inner = self.lock();
        let Inner { state, bus } = &mut *inner;
        let agent = authenticate(state, token)?;
        state.agents.touch(&agent.id, now, Some("wayfinding"));
        let (outcome, events) = ops::wayfinding::submit_action(state, &agent, action, now);
        bus.publish_all(&events);
        Ok(outcome)
    }

    /// Finalize completed movements. Driven by the 500 ms ticker.
    pub fn tick(&self) {
        self.tick_at(now_ms());
    }

    pub fn tick_at(&self, now: Millis) {
        let mut inner = self.lock();
        let Inner { state, bus } = &mut *inner;
        let events = ops::wayfinding::tick(state, now);
        bus.publish_all(&events);
    }

    // ── Ritual ──────────────────────────────────────────────────────

    pub fn ritual_view(&self, token: Option<&str>) -> RitualView {
        let now = now_ms();
        let inner = self.lock();
        let agent_id = token
            .and_then(|t| inner.state.agents.by_token(t))
            .map(|a| a.id.clone());
        ops::ritual::view(&inner.state, agent_id.as_ref(), now)
    }

    pub fn ritual_nominate(
        &self,
        token: &str,
        bpm: Option<u16>,
        key: Option<&str>,
        scale: Option<&str>,
        reasoning: &str,
    ) -> Result<RitualView, CoreError> {
        let now = now_ms();
        let mut inner = self.lock();
        let Inner { state, bus } = &mut *inner;
        let agent = authenticate(state, token)?;
        state.agents.touch(&agent.id, now, Some("nominating"));
        let (view, events) =
            ops::ritual::nominate(state, &agent, bpm, key, scale, reasoning, now)?;
        bus.publish_all(&events);
        Ok(view)
    }

    pub fn ritual_vote(
        &self,
        token: &str,
        bpm_index: Option<usize>,
        key_index: Option<usize>,
    ) -> Result<RitualView, CoreError> {
        let now = now_ms();
        let mut inner = self.lock();
        let Inner { state, bus } = &mut *inner;
        let agent = authenticate(state, token)?;
        state.agents.touch(&agent.id, now, Some("voting"));
        let (view, events) = ops::ritual::vote(state, &agent, bpm_index, key_index, now)?;
        bus.publish_all(&events);
        Ok(view)
    }

    /// Advance the ritual phase machine. Driven by the scheduler thread.
    pub fn ritual_tick(&self) {
        self.ritual_tick_at(now_ms());
    }

    pub fn ritual_tick_at(&self, now: Millis) {
        let mut inner = self.lock();
        let Inner { state, bus } = &mut *inner;
        let events = ops::ritual::tick(state, &self.config, now);
        bus.publish_all(&events);
    }

    // ── Messaging & directives ──────────────────────────────────────

    pub fn messages(&self) -> Vec<AgentMessage> {
        self.lock().state.messaging.messages()
    }

    pub fn post_message(
        &self,
        token: &str,
        content: &str,
        to_agent_id: Option<AgentId>,
    ) -> Result<AgentMessage, CoreError> {
        let now = now_ms();
        let mut inner = self.lock();
        let Inner { state, bus } = &mut *inner;
        let agent = authenticate(state, token)?;
        state.agents.touch(&agent.id, now, None);
        let (message, events) =
            ops::messaging::post_agent_message(state, &agent, content, to_agent_id, now);
        bus.publish_all(&events);
        Ok(message)
    }

    pub fn post_human_message(
        &self,
        sender_type: SenderType,
        from_name: &str,
        content: &str,
        ip_hash: u64,
    ) -> Result<AgentMessage, CoreError> {
        let now = now_ms();
        let mut inner = self.lock();
        let Inner { state, bus } = &mut *inner;
        let (message, events) =
            ops::messaging::post_human_message(state, sender_type, from_name, content, ip_hash, now)?;
        bus.publish_all(&events);
        Ok(message)
    }

    pub fn post_directive(
        &self,
        from_address: &str,
        to_agent_id: AgentId,
        content: &str,
        tx_hash: &str,
    ) -> Result<Directive, CoreError> {
        let now = now_ms();
        let mut inner = self.lock();
        let Inner { state, bus } = &mut *inner;
        let (directive, events) =
            ops::messaging::add_directive(state, from_address, to_agent_id, content, tx_hash, now)?;
        bus.publish_all(&events);
        Ok(directive)
    }

    pub fn pending_directives(&self, token: &str) -> Result<Vec<Directive>, CoreError> {
        let now = now_ms();
        let mut inner = self.lock();
        let agent = authenticate(&inner.state, token)?;
        inner.state.agents.touch(&agent.id, now, None);
        Ok(ops::messaging::pending_directives(&mut inner.state, &agent, now))
    }

    // ── Admin ───────────────────────────────────────────────────────

    /// Whether the provided admin key matches the configured one. Reset
    /// is disabled remotely when no key is configured.
    pub fn admin_key_matches(&self, provided: &str) -> bool {
        self.config
            .reset_admin_key
            .as_deref()
            .is_some_and(|key| key == provided)
    }

    /// Purge every component, reseed slots and epoch, and publish full
    /// snapshots so every subscriber resynchronizes.
    pub fn reset(&self) -> ResetCounters {
        let now = now_ms();
        let mut inner = self.lock();
        let Inner { state, bus } = &mut *inner;

        let counters = ResetCounters {
            agents: state.agents.len(),
            sessions: state.sessions.len(),
            placements: state.placements.len(),
            messages: state.messaging.message_count(),
            directives: state.messaging.directive_count(),
            reset_count: state.reset_count + 1,
        };
        state.reset(now, self.config.ritual_interval_ms);
        log::warn!(target: "core", "admin reset: cleared {} agents", counters.agents);

        let events = vec![
            ops::composition_event(state),
            ops::session_snapshot_event(state),
            ops::jam_snapshot_event(state),
            ops::world_snapshot_event(state),
            ops::placement_snapshot_event(state),
            CoreEvent::new(
                names::ADMIN_RESET,
                json!({
                    "at": now,
                    "cleared": &counters,
                }),
            ),
        ];
        bus.publish_all(&events);
        counters
    }
}

fn authenticate(state: &CoreState, token: &str) -> Result<Agent, CoreError> {
    state
        .agents
        .by_token(token)
        .cloned()
        .ok_or(CoreError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::ChannelSubscriber;

    fn core() -> Core {
        Core::new(CoreConfig::default())
    }

    #[test]
    fn bad_token_is_unauthorized() {
        let core = core();
        assert_eq!(
            core.write_slot("nope", 1, "s(\"bd\")").unwrap_err(),
            CoreError::Unauthorized
        );
        assert_eq!(
            core.agent_status("nope").unwrap_err(),
            CoreError::Unauthorized
        );
    }

    #[test]
    fn slot_write_publishes_in_order_under_the_lock() {
        let core = core();
        let (sub, rx) = ChannelSubscriber::pair(64);
        core.subscribe(Box::new(sub));

        let alice = core.register_agent("alice").unwrap();
        core.write_slot(&alice.token, 1, "s(\"bd sd\")").unwrap();
        let event = rx.try_recv().unwrap();
        assert_eq!(event.name, "slot_update");
        assert_eq!(event.payload["agent"]["name"], "alice");
    }

    #[test]
    fn full_registration_flow() {
        let core = core();
        let alice = core.register_agent("alice").unwrap();
        assert_eq!(alice.token.len(), 64);
        assert_eq!(
            core.register_agent("alice").unwrap_err(),
            CoreError::NameTaken
        );

        let status = core.agent_status(&alice.token).unwrap();
        assert!(status.online);
        assert_eq!(core.online_agents().len(), 1);
    }

    #[test]
    fn session_flow_via_facade() {
        let core = core();
        let a = core.register_agent("a").unwrap();
        let b = core.register_agent("b").unwrap();

        let (session, created) = core
            .start_session(&a.token, SessionType::Music, None, None, None, None)
            .unwrap();
        assert!(created);
        core.join_session(&b.token, &session.id, None, None).unwrap();
        assert_eq!(core.sessions()[0].participants.len(), 2);

        core.leave_session(&a.token, None).unwrap();
        let sessions = core.sessions();
        assert_eq!(sessions[0].creator_bot_name, "b");
    }

    #[test]
    fn reset_publishes_snapshots_and_counters() {
        let core = core();
        let a = core.register_agent("a").unwrap();
        core.write_slot(&a.token, 1, "s(\"bd\")").unwrap();

        let (sub, rx) = ChannelSubscriber::pair(64);
        core.subscribe(Box::new(sub));

        let counters = core.reset();
        assert_eq!(counters.agents, 1);
        assert_eq!(counters.reset_count, 1);

        let received: Vec<String> = rx.try_iter().map(|e| e.name).collect();
        assert_eq!(
            received,
            [
                "composition",
                "session_snapshot",
                "jam_snapshot",
                "world_snapshot",
                "music_placement_snapshot",
                "admin_reset"
            ]
        );
        // The old token no longer authenticates.
        assert_eq!(
            core.agent_status(&a.token).unwrap_err(),
            CoreError::Unauthorized
        );
    }

    #[test]
    fn admin_key_matching() {
        let mut config = CoreConfig::default();
        assert!(!Core::new(config.clone()).admin_key_matches("anything"));
        config.reset_admin_key = Some("sekrit".into());
        let core = Core::new(config);
        assert!(core.admin_key_matches("sekrit"));
        assert!(!core.admin_key_matches("guess"));
    }

    #[test]
    fn ritual_tick_fizzles_without_agents() {
        let core = core();
        let (sub, rx) = ChannelSubscriber::pair(64);
        core.subscribe(Box::new(sub));

        // Fire well past the first interval.
        core.ritual_tick_at(now_ms() + 700_000);
        let received: Vec<String> = rx.try_iter().map(|e| e.name).collect();
        assert_eq!(received, ["epoch_changed", "composition", "ritual_phase"]);
        let context = core.context();
        assert_eq!(context["epoch"]["epoch"], 2);
    }

    #[test]
    fn world_round_trip_via_facade() {
        let core = core();
        let x = core.register_agent("x").unwrap();
        let y = core.register_agent("y").unwrap();

        core.write_world(&x.token, r##"{"sky":"#000000"}"##).unwrap();
        core.write_world(&y.token, r##"{"sky":"#ffffff"}"##).unwrap();
        let snapshot = core.clear_world(&x.token).unwrap();
        assert_eq!(snapshot.environment["sky"], "#ffffff");
    }
}
