//! Wall-clock access.
//!
//! All core state stores absolute millisecond timestamps; boolean facts
//! (online, cooling down, moving) are derived at read time from `now`.
//! Operations take `now` as a parameter so tests can drive synthetic
//! clocks; this helper is what the facade and tickers feed them with.

use std::time::{SystemTime, UNIX_EPOCH};

use synthmob_types::Millis;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> Millis {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as Millis
}

/// Round a millisecond remainder up to whole seconds, for retry-after
/// fields. Never returns 0 for a nonzero remainder.
pub fn secs_ceil(ms: Millis) -> u64 {
    ms.div_ceil(1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secs_ceil_rounds_up() {
        assert_eq!(secs_ceil(0), 0);
        assert_eq!(secs_ceil(1), 1);
        assert_eq!(secs_ceil(1000), 1);
        assert_eq!(secs_ceil(59_001), 60);
    }
}
