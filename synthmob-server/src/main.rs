//! SynthMob server binary: wires config, core, journal, tickers, and the
//! TCP adapter together. The core value is owned here and injected;
//! no module-level singletons.

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{error, info, warn};

use synthmob_core::{spawn_tickers, Core, CoreConfig, EventJournal};
use synthmob_net::NetServer;

fn main() -> ExitCode {
    env_logger::init();

    let config = CoreConfig::load();
    let bind_addr = format!("0.0.0.0:{}", config.port);
    info!(
        "starting synthmob (ritual interval {}s, port {})",
        config.ritual_interval_ms / 1000,
        config.port
    );
    if config.reset_admin_key.is_none() {
        warn!("RESET_ADMIN_KEY not set; admin reset is disabled");
    }

    let journal_path = config.journal_path.clone();
    let core = Arc::new(Core::new(config));

    if let Some(path) = journal_path {
        match EventJournal::open(&path) {
            Some(journal) => {
                core.subscribe(Box::new(journal));
                info!("journaling events to {}", path.display());
            }
            None => warn!("could not open journal at {}; continuing without", path.display()),
        }
    }

    let _tickers = spawn_tickers(Arc::clone(&core));

    let mut server = match NetServer::bind(&bind_addr, Arc::clone(&core)) {
        Ok(server) => server,
        Err(e) => {
            error!("failed to bind {}: {}", bind_addr, e);
            return ExitCode::FAILURE;
        }
    };

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    if let Err(e) = ctrlc::set_handler(move || {
        info!("shutdown requested");
        handler_stop.store(true, Ordering::Relaxed);
    }) {
        warn!("could not install ctrl-c handler: {}", e);
    }

    server.run(&stop);
    info!("bye");
    ExitCode::SUCCESS
}
