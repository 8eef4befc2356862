//! Background tickers: the 500 ms wayfinding sweep and the ritual phase
//! scheduler.
//!
//! Both deadlines are absolute, so a late tick only delays event
//! emission; query correctness never depends on tick cadence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::info;

use crate::facade::Core;

/// Wayfinding finalize cadence.
const TICK_INTERVAL_MS: u64 = 500;

/// Ritual scheduler poll cadence. Phases fire on absolute deadlines; the
/// poll only bounds the latency of a transition.
const RITUAL_POLL_INTERVAL_MS: u64 = 100;

/// Handles to the background threads. Stops and joins on drop.
pub struct Tickers {
    stop: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

/// Spawn both tickers against a shared core.
pub fn spawn_tickers(core: Arc<Core>) -> Tickers {
    let stop = Arc::new(AtomicBool::new(false));

    let tick_core = Arc::clone(&core);
    let tick_stop = Arc::clone(&stop);
    let tick_handle = thread::spawn(move || {
        while !tick_stop.load(Ordering::Relaxed) {
            tick_core.tick();
            thread::sleep(Duration::from_millis(TICK_INTERVAL_MS));
        }
    });

    let ritual_stop = Arc::clone(&stop);
    let ritual_handle = thread::spawn(move || {
        while !ritual_stop.load(Ordering::Relaxed) {
            core.ritual_tick();
            thread::sleep(Duration::from_millis(RITUAL_POLL_INTERVAL_MS));
        }
    });

    info!(target: "ticker", "background tickers started");
    Tickers {
        stop,
        handles: vec![tick_handle, ritual_handle],
    }
}

impl Tickers {
    /// Signal both threads and join them.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for Tickers {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;

    #[test]
    fn tickers_start_and_stop_cleanly() {
        let core = Arc::new(Core::new(CoreConfig::default()));
        let mut tickers = spawn_tickers(Arc::clone(&core));
        thread::sleep(Duration::from_millis(50));
        tickers.stop();
        // Stopping twice is harmless.
        tickers.stop();
    }
}
