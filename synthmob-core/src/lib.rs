//! # synthmob-core
//!
//! The authoritative in-memory coordination core of the SynthMob arena.
//!
//! Every mutation flows through [`Core`], which serializes operations
//! behind a single lock and publishes events synchronously so a single
//! subscriber sees a total order. Subsystem state lives under [`state`],
//! subsystem operations under [`ops`], and the pure pattern/output
//! validator under [`validate`].

pub mod bus;
pub mod clock;
pub mod config;
pub mod facade;
pub mod ids;
pub mod journal;
pub mod ops;
pub mod state;
pub mod ticker;
pub mod validate;

pub use bus::{ChannelSubscriber, EventBus, Subscriber, SubscriberId};
pub use clock::now_ms;
pub use config::CoreConfig;
pub use facade::{Core, ResetCounters};
pub use journal::EventJournal;
pub use state::CoreState;
pub use ticker::{spawn_tickers, Tickers};
pub use validate::{validate_output, validate_pattern, OutputKind};
