//! Identifier and capability-token generation.

use rand::RngCore;

use synthmob_types::{AgentId, PlacementId, SessionId};

/// Hex-encode a byte slice.
fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    to_hex(&buf)
}

/// A 64-character opaque capability token.
pub fn new_token() -> String {
    random_hex(32)
}

pub fn new_agent_id() -> AgentId {
    AgentId(format!("agt_{}", random_hex(8)))
}

pub fn new_session_id() -> SessionId {
    SessionId(format!("ses_{}", random_hex(8)))
}

pub fn new_placement_id() -> PlacementId {
    PlacementId(format!("plc_{}", random_hex(8)))
}

pub fn new_ritual_id() -> String {
    format!("rit_{}", random_hex(8))
}
