#![allow(dead_code)]
//! Test harness for synthmob-net integration tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use synthmob_core::{Core, CoreConfig};
use synthmob_net::client::AgentClient;
use synthmob_net::protocol::ServerReply;
use synthmob_net::server::NetServer;

/// The admin key every test server is configured with.
pub const TEST_ADMIN_KEY: &str = "test-admin";

/// A server on an ephemeral port, driven by a background thread.
pub struct TestServer {
    pub addr: String,
    pub core: Arc<Core>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

/// Bind on port 0 and run the loop until the harness drops.
pub fn start_server() -> TestServer {
    let mut config = CoreConfig::default();
    config.reset_admin_key = Some(TEST_ADMIN_KEY.to_string());
    let core = Arc::new(Core::new(config));

    let mut server = NetServer::bind("127.0.0.1:0", Arc::clone(&core)).unwrap();
    let addr = server.local_addr().unwrap().to_string();

    let stop = Arc::new(AtomicBool::new(false));
    let thread_stop = Arc::clone(&stop);
    let handle = thread::spawn(move || server.run(&thread_stop));

    TestServer {
        addr,
        core,
        stop,
        handle: Some(handle),
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Connect and register, panicking on any failure.
pub fn registered_client(server: &TestServer, name: &str) -> AgentClient {
    let mut client = AgentClient::connect(&server.addr).unwrap();
    match client.register(name).unwrap() {
        ServerReply::Registered { .. } => client,
        other => panic!("registration failed: {:?}", other),
    }
}

/// Receive timeout generous enough for a loaded CI box.
pub fn recv_timeout() -> Duration {
    Duration::from_secs(2)
}
