//! Core state: one struct per subsystem, composed into [`CoreState`].
//!
//! Stores own plain data and narrow operations; cross-subsystem
//! orchestration and event payloads live in [`crate::ops`]. No store
//! reaches into another store's internals.

pub mod agents;
pub mod board;
pub mod messaging;
pub mod placements;
pub mod ritual;
pub mod sessions;
pub mod wayfinding;
pub mod world;

pub use agents::AgentRegistry;
pub use board::{SlotBoard, SlotWrite};
pub use messaging::MessageStore;
pub use placements::PlacementStore;
pub use ritual::RitualStore;
pub use sessions::{JoinOutcome, LeaveOutcome, SessionStore, StartOutcome};
pub use wayfinding::{AgentNav, WayfindingStore};
pub use world::WorldStore;

use synthmob_types::{EpochContext, Millis};

/// Everything the core owns, composed. The facade holds exactly one of
/// these behind its lock.
pub struct CoreState {
    pub agents: AgentRegistry,
    pub board: SlotBoard,
    pub placements: PlacementStore,
    pub sessions: SessionStore,
    pub world: WorldStore,
    pub wayfinding: WayfindingStore,
    pub ritual: RitualStore,
    pub messaging: MessageStore,
    pub epoch: EpochContext,
    /// Total admin resets since boot; survives resets.
    pub reset_count: u64,
}

impl CoreState {
    pub fn new(now: Millis, ritual_interval_ms: u64) -> Self {
        Self {
            agents: AgentRegistry::new(),
            board: SlotBoard::new(),
            placements: PlacementStore::new(),
            sessions: SessionStore::new(),
            world: WorldStore::new(),
            wayfinding: WayfindingStore::new(),
            ritual: RitualStore::new(now, ritual_interval_ms),
            messaging: MessageStore::new(),
            epoch: EpochContext::initial(now),
            reset_count: 0,
        }
    }

    /// Purge every component, reseed the board, the epoch, and the
    /// ritual schedule. The reset counter is carried forward.
    pub fn reset(&mut self, now: Millis, ritual_interval_ms: u64) {
        self.agents.clear();
        self.board.reset();
        self.placements.clear();
        self.sessions.clear();
        self.world.clear();
        self.wayfinding.clear();
        self.ritual.reset(now, ritual_interval_ms);
        self.messaging.clear();
        self.epoch = EpochContext::initial(now);
        self.reset_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_purges_and_reseeds() {
        let mut state = CoreState::new(1_000, 600_000);
        let agent = state.agents.register("a", 1_000).unwrap();
        state.board.write(1, "s(\"bd\")", &agent, 1_000).unwrap();
        state.epoch.bpm = 175;

        state.reset(2_000, 600_000);
        assert!(state.agents.is_empty());
        assert!(state.board.slot(1).unwrap().is_empty());
        assert_eq!(state.epoch.bpm, 120);
        assert_eq!(state.epoch.epoch, 1);
        assert_eq!(state.reset_count, 1);
    }
}
