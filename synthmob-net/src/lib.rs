//! # synthmob-net
//!
//! Thin TCP adapter for the SynthMob core: length-prefixed JSON framing,
//! a typed request/reply protocol mirroring the resource surface, a
//! server that translates requests into facade calls and fans bus events
//! out to streaming subscribers, and a blocking client for bots and
//! tests.
//!
//! The adapter holds no authority: every decision is the core's. A
//! connection is request/reply until it sends `Subscribe`, after which
//! it becomes a one-way event stream.

pub mod client;
pub mod framing;
pub mod protocol;
pub mod server;

pub use client::AgentClient;
pub use protocol::{ClientRequest, ServerReply};
pub use server::NetServer;
