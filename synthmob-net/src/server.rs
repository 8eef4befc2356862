//! Network server: accepts connections, translates requests into facade
//! calls, and fans core events out to streaming subscribers.
//!
//! One reader thread per connection feeds a channel; the main loop
//! (driven by [`NetServer::poll`]) handles requests in arrival order,
//! writes replies directly, and drains the core's event queue to every
//! subscribed client. A client whose socket fails is dropped; the core
//! never notices.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::io::{self, BufReader};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver as EventReceiver;
use log::{debug, error, info, warn};

use synthmob_core::bus::ChannelSubscriber;
use synthmob_core::Core;
use synthmob_types::event::names;
use synthmob_types::{CoreEvent, SenderType, SessionType};

use crate::framing::{read_message, write_message};
use crate::protocol::{ClientRequest, ServerReply};

/// Heartbeat cadence for stream-mode connections.
const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Queue depth for core events awaiting fanout.
const EVENT_QUEUE_CAPACITY: usize = 1024;

/// Write timeout so one stuck client cannot stall the loop.
const WRITE_TIMEOUT: Duration = Duration::from_millis(50);

/// Unique identifier for a connected client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub u64);

enum ReaderEvent {
    Request(ClientId, Box<ClientRequest>),
    /// A frame that was JSON but not a valid request.
    BadRequest(ClientId, String),
    Closed(ClientId),
}

struct ClientConn {
    stream: TcpStream,
    addr: SocketAddr,
    /// True once the connection switched into event-stream mode.
    subscribed: bool,
}

/// TCP adapter over a shared core.
pub struct NetServer {
    listener: TcpListener,
    core: Arc<Core>,
    clients: HashMap<ClientId, ClientConn>,
    reader_rx: Receiver<ReaderEvent>,
    reader_tx: Sender<ReaderEvent>,
    events: EventReceiver<CoreEvent>,
    next_client_id: u64,
    last_heartbeat: Instant,
}

impl NetServer {
    /// Bind and register the event bridge on the core bus.
    pub fn bind(addr: &str, core: Arc<Core>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let (reader_tx, reader_rx) = mpsc::channel();

        let (subscriber, events) = ChannelSubscriber::pair(EVENT_QUEUE_CAPACITY);
        core.subscribe(Box::new(subscriber));

        info!(target: "net", "listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            core,
            clients: HashMap::new(),
            reader_rx,
            reader_tx,
            events,
            next_client_id: 0,
            last_heartbeat: Instant::now(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// One iteration of the server loop: accept, handle requests, fan
    /// out events, heartbeat. Returns the number of requests handled.
    pub fn poll(&mut self) -> usize {
        self.accept_connections();
        let handled = self.drain_requests();
        self.fan_out_events();
        self.heartbeat();
        handled
    }

    /// Run until `stop` is set. The sleep keeps an idle server cheap.
    pub fn run(&mut self, stop: &AtomicBool) {
        while !stop.load(Ordering::Relaxed) {
            if self.poll() == 0 {
                thread::sleep(Duration::from_millis(5));
            }
        }
        info!(target: "net", "server loop stopped");
    }

    fn accept_connections(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if let Err(e) = self.setup_client(stream, addr) {
                        error!(target: "net", "failed to set up client from {}: {}", addr, e);
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    error!(target: "net", "accept error: {}", e);
                    break;
                }
            }
        }
    }

    fn setup_client(&mut self, stream: TcpStream, addr: SocketAddr) -> io::Result<()> {
        // Accepted streams may inherit nonblocking from the listener.
        stream.set_nonblocking(false)?;
        stream.set_write_timeout(Some(WRITE_TIMEOUT))?;

        let client_id = ClientId(self.next_client_id);
        self.next_client_id += 1;

        let read_stream = stream.try_clone()?;
        let reader_tx = self.reader_tx.clone();
        thread::spawn(move || client_reader_thread(client_id, read_stream, reader_tx));

        self.clients.insert(
            client_id,
            ClientConn {
                stream,
                addr,
                subscribed: false,
            },
        );
        debug!(target: "net", "client {:?} connected from {}", client_id, addr);
        Ok(())
    }

    fn drain_requests(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.reader_rx.try_recv() {
            match event {
                ReaderEvent::Request(client_id, request) => {
                    handled += 1;
                    let reply = self.handle_request(client_id, &request);
                    if let Some(reply) = reply {
                        self.send_to(client_id, &reply);
                    }
                }
                ReaderEvent::BadRequest(client_id, detail) => {
                    handled += 1;
                    self.send_to(
                        client_id,
                        &ServerReply::Error {
                            code: "invalid_json".to_string(),
                            message: detail,
                            retry_after: None,
                            details: None,
                        },
                    );
                }
                ReaderEvent::Closed(client_id) => {
                    self.clients.remove(&client_id);
                    debug!(target: "net", "client {:?} disconnected", client_id);
                }
            }
        }
        handled
    }

    /// Dispatch one request to the core. Returns `None` when the request
    /// produced its own frames (subscribe).
    fn handle_request(
        &mut self,
        client_id: ClientId,
        request: &ClientRequest,
    ) -> Option<ServerReply> {
        let core = Arc::clone(&self.core);
        let reply = match request {
            ClientRequest::Register { name } => match core.register_agent(name) {
                Ok(agent) => ServerReply::Registered {
                    id: agent.id,
                    name: agent.name,
                    token: agent.token,
                },
                Err(e) => ServerReply::from_error(&e),
            },
            ClientRequest::AgentStatus { token } => match core.agent_status(token) {
                Ok(status) => ServerReply::Status { status },
                Err(e) => ServerReply::from_error(&e),
            },
            ClientRequest::OnlineAgents => ServerReply::Online {
                agents: core.online_agents(),
            },
            ClientRequest::Composition => ServerReply::Composition {
                composition: core.composition(),
            },
            ClientRequest::Context => ServerReply::Context {
                context: core.context(),
            },
            ClientRequest::WriteSlot { token, slot, code } => {
                match core.write_slot(token, *slot, code) {
                    Ok((slot, validation)) => ServerReply::SlotWritten {
                        slot,
                        warnings: ServerReply::warnings(&validation),
                    },
                    Err(e) => ServerReply::from_error(&e),
                }
            }
            ClientRequest::Placements => ServerReply::Placements {
                placements: core.placements(),
            },
            ClientRequest::PlaceMusic {
                token,
                instrument_type,
                pattern,
                position,
            } => match core.place_music(token, *instrument_type, pattern, *position) {
                Ok((placement, validation)) => ServerReply::Placed {
                    placement,
                    warnings: ServerReply::warnings(&validation),
                },
                Err(e) => ServerReply::from_error(&e),
            },
            ClientRequest::UpdatePlacement { token, id, pattern } => {
                match core.update_placement(token, id, pattern) {
                    Ok((placement, validation)) => ServerReply::Placed {
                        placement,
                        warnings: ServerReply::warnings(&validation),
                    },
                    Err(e) => ServerReply::from_error(&e),
                }
            }
            ClientRequest::RemovePlacement { token, id } => {
                match core.remove_placement(token, id) {
                    Ok(()) => ServerReply::Removed,
                    Err(e) => ServerReply::from_error(&e),
                }
            }
            ClientRequest::World => ServerReply::World {
                world: core.world_snapshot(),
            },
            ClientRequest::WriteWorld { token, output } => {
                let raw = output.to_string();
                match core.write_world(token, &raw) {
                    Ok((world, validation)) => ServerReply::WorldWritten {
                        world,
                        warnings: ServerReply::warnings(&validation),
                    },
                    Err(e) => ServerReply::from_error(&e),
                }
            }
            ClientRequest::Sessions => ServerReply::Sessions {
                sessions: core.sessions(),
            },
            ClientRequest::Jams => {
                info!(target: "net", "legacy jam list endpoint used");
                ServerReply::Sessions {
                    sessions: core
                        .sessions()
                        .into_iter()
                        .filter(|s| s.session_type == SessionType::Music)
                        .collect(),
                }
            }
            ClientRequest::StartJam {
                token,
                title,
                pattern,
            } => {
                info!(target: "net", "legacy jam start endpoint used");
                match core.start_session(
                    token,
                    SessionType::Music,
                    title.clone(),
                    pattern.clone(),
                    None,
                    None,
                ) {
                    Ok((session, created)) => ServerReply::Session { session, created },
                    Err(e) => ServerReply::from_error(&e),
                }
            }
            ClientRequest::JoinJam {
                token,
                session_id,
                pattern,
            } => {
                info!(target: "net", "legacy jam join endpoint used");
                match core.join_session(token, session_id, pattern.clone(), None) {
                    Ok(session) => ServerReply::Session {
                        session,
                        created: false,
                    },
                    Err(e) => ServerReply::from_error(&e),
                }
            }
            ClientRequest::StartSession {
                token,
                session_type,
                title,
                pattern,
                output,
                position,
            } => match core.start_session(
                token,
                *session_type,
                title.clone(),
                pattern.clone(),
                output.clone(),
                position.as_ref().map(|p| (p.x, p.z)),
            ) {
                Ok((session, created)) => ServerReply::Session { session, created },
                Err(e) => ServerReply::from_error(&e),
            },
            ClientRequest::JoinSession {
                token,
                session_id,
                pattern,
                output,
            } => match core.join_session(token, session_id, pattern.clone(), output.clone()) {
                Ok(session) => ServerReply::Session {
                    session,
                    created: false,
                },
                Err(e) => ServerReply::from_error(&e),
            },
            ClientRequest::SessionOutput {
                token,
                session_id,
                pattern,
                output,
            } => match core.session_output(token, session_id, pattern.clone(), output.clone()) {
                Ok(session) => ServerReply::Session {
                    session,
                    created: false,
                },
                Err(e) => ServerReply::from_error(&e),
            },
            ClientRequest::LeaveSession { token, session_id } => {
                match core.leave_session(token, session_id.as_ref()) {
                    Ok(session_id) => ServerReply::Left { session_id },
                    Err(e) => ServerReply::from_error(&e),
                }
            }
            ClientRequest::WayfindingState { token } => match core.wayfinding_state(token) {
                Ok(state) => ServerReply::Wayfinding { state },
                Err(e) => ServerReply::from_error(&e),
            },
            ClientRequest::WayfindingAction { token, action } => {
                match core.wayfinding_action(token, action) {
                    Ok(outcome) => ServerReply::ActionResult { outcome },
                    Err(e) => ServerReply::from_error(&e),
                }
            }
            ClientRequest::Ritual { token } => ServerReply::Ritual {
                ritual: core.ritual_view(token.as_deref()),
            },
            ClientRequest::RitualNominate {
                token,
                bpm,
                key,
                scale,
                reasoning,
            } => match core.ritual_nominate(token, *bpm, key.as_deref(), scale.as_deref(), reasoning)
            {
                Ok(ritual) => ServerReply::Ritual { ritual },
                Err(e) => ServerReply::from_error(&e),
            },
            ClientRequest::RitualVote {
                token,
                bpm_candidate,
                key_candidate,
            } => match core.ritual_vote(token, *bpm_candidate, *key_candidate) {
                Ok(ritual) => ServerReply::Ritual { ritual },
                Err(e) => ServerReply::from_error(&e),
            },
            ClientRequest::Messages => ServerReply::Messages {
                messages: core.messages(),
            },
            ClientRequest::PostMessage { token, content, to } => {
                match core.post_message(token, content, to.clone()) {
                    Ok(message) => ServerReply::Posted { message },
                    Err(e) => ServerReply::from_error(&e),
                }
            }
            ClientRequest::PostHumanMessage { name, content } => {
                let ip_hash = self
                    .clients
                    .get(&client_id)
                    .map(|c| hash_ip(&c.addr))
                    .unwrap_or(0);
                let from = name.as_deref().unwrap_or("human");
                match core.post_human_message(SenderType::Human, from, content, ip_hash) {
                    Ok(message) => ServerReply::Posted { message },
                    Err(e) => ServerReply::from_error(&e),
                }
            }
            ClientRequest::PostDirective {
                from_address,
                to_agent_id,
                content,
                tx_hash,
            } => match core.post_directive(from_address, to_agent_id.clone(), content, tx_hash) {
                Ok(directive) => ServerReply::DirectivePosted { directive },
                Err(e) => ServerReply::from_error(&e),
            },
            ClientRequest::Directives { token } => match core.pending_directives(token) {
                Ok(directives) => ServerReply::Directives { directives },
                Err(e) => ServerReply::from_error(&e),
            },
            ClientRequest::AdminReset { admin_key } => {
                if core.admin_key_matches(admin_key) {
                    let counters = core.reset();
                    ServerReply::ResetDone {
                        counters: serde_json::to_value(&counters)
                            .unwrap_or_else(|_| serde_json::json!({})),
                    }
                } else {
                    warn!(target: "net", "admin reset rejected for {:?}", client_id);
                    ServerReply::Error {
                        code: "unauthorized".to_string(),
                        message: "unauthorized".to_string(),
                        retry_after: None,
                        details: None,
                    }
                }
            }
            ClientRequest::Subscribe => {
                if let Some(client) = self.clients.get_mut(&client_id) {
                    client.subscribed = true;
                }
                self.send_to(
                    client_id,
                    &ServerReply::Event {
                        event: names::CONNECTED.to_string(),
                        payload: serde_json::json!({}),
                    },
                );
                return None;
            }
            ClientRequest::Ping => ServerReply::Pong,
        };
        Some(reply)
    }

    /// Deliver queued core events to every subscribed client.
    fn fan_out_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            let frame = ServerReply::Event {
                event: event.name.clone(),
                payload: event.payload.clone(),
            };
            self.broadcast_to_subscribed(&frame);
        }
    }

    fn heartbeat(&mut self) {
        if self.last_heartbeat.elapsed().as_secs() < HEARTBEAT_INTERVAL_SECS {
            return;
        }
        self.last_heartbeat = Instant::now();
        self.broadcast_to_subscribed(&ServerReply::Heartbeat);
    }

    fn broadcast_to_subscribed(&mut self, reply: &ServerReply) {
        let mut failed = Vec::new();
        for (id, client) in self.clients.iter_mut().filter(|(_, c)| c.subscribed) {
            if write_message(&mut client.stream, reply).is_err() {
                failed.push(*id);
            }
        }
        for id in failed {
            warn!(target: "net", "dropping stalled subscriber {:?}", id);
            self.clients.remove(&id);
        }
    }

    fn send_to(&mut self, client_id: ClientId, reply: &ServerReply) {
        let Some(client) = self.clients.get_mut(&client_id) else { return };
        if let Err(e) = write_message(&mut client.stream, reply) {
            warn!(target: "net", "write to {:?} failed: {}", client_id, e);
            self.clients.remove(&client_id);
        }
    }
}

/// Stable hash of a peer address, for the human-post rate limit.
fn hash_ip(addr: &SocketAddr) -> u64 {
    let mut hasher = DefaultHasher::new();
    addr.ip().hash(&mut hasher);
    hasher.finish()
}

/// Reader thread: one per connection, feeding the main loop's channel.
fn client_reader_thread(
    client_id: ClientId,
    stream: TcpStream,
    reader_tx: Sender<ReaderEvent>,
) {
    let mut reader = BufReader::new(stream);
    loop {
        // Read any JSON frame first so a malformed request gets an error
        // reply instead of killing the connection.
        match read_message::<_, serde_json::Value>(&mut reader) {
            Ok(raw) => {
                let event = match serde_json::from_value::<ClientRequest>(raw) {
                    Ok(request) => ReaderEvent::Request(client_id, Box::new(request)),
                    Err(e) => ReaderEvent::BadRequest(client_id, e.to_string()),
                };
                if reader_tx.send(event).is_err() {
                    break;
                }
            }
            Err(e) => {
                if e.kind() != io::ErrorKind::UnexpectedEof {
                    debug!(target: "net", "reader for {:?} ended: {}", client_id, e);
                }
                let _ = reader_tx.send(ReaderEvent::Closed(client_id));
                break;
            }
        }
    }
}
