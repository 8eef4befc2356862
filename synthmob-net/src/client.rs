//! Blocking client for bots and tests.
//!
//! One connection, one request in flight at a time: every call writes a
//! request frame and blocks on the matching reply. For the event stream,
//! [`AgentClient::subscribe`] consumes the client and hands back a
//! receiver fed by a background reader thread.

use std::io::{self, BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use log::debug;

use synthmob_types::{AgentId, InstrumentType, Position, SessionId, SessionType, WayfindingAction};

use crate::framing::{read_message, write_message};
use crate::protocol::{ClientRequest, ServerReply};

/// A connected client. Holds the agent token after `register`.
pub struct AgentClient {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    token: Option<String>,
}

/// An event received in stream mode.
#[derive(Debug, Clone)]
pub struct StreamEvent {
    pub event: String,
    pub payload: serde_json::Value,
}

impl AgentClient {
    pub fn connect(addr: &str) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        let read_half = stream.try_clone()?;
        debug!(target: "client", "connected to {}", addr);
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(stream),
            token: None,
        })
    }

    /// The capability token, once registered or attached.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Act as an existing agent using its token.
    pub fn attach(&mut self, token: &str) {
        self.token = Some(token.to_string());
    }

    fn auth(&self) -> io::Result<String> {
        self.token
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::PermissionDenied, "not registered"))
    }

    /// Send one request and wait for its reply.
    pub fn call(&mut self, request: &ClientRequest) -> io::Result<ServerReply> {
        write_message(&mut self.writer, request)?;
        read_message(&mut self.reader)
    }

    /// Register a new agent and remember its token.
    pub fn register(&mut self, name: &str) -> io::Result<ServerReply> {
        let reply = self.call(&ClientRequest::Register {
            name: name.to_string(),
        })?;
        if let ServerReply::Registered { token, .. } = &reply {
            self.token = Some(token.clone());
        }
        Ok(reply)
    }

    pub fn write_slot(&mut self, slot: u8, code: &str) -> io::Result<ServerReply> {
        let token = self.auth()?;
        self.call(&ClientRequest::WriteSlot {
            token,
            slot,
            code: code.to_string(),
        })
    }

    pub fn place_music(
        &mut self,
        instrument_type: InstrumentType,
        pattern: &str,
        position: Option<Position>,
    ) -> io::Result<ServerReply> {
        let token = self.auth()?;
        self.call(&ClientRequest::PlaceMusic {
            token,
            instrument_type,
            pattern: pattern.to_string(),
            position,
        })
    }

    pub fn composition(&mut self) -> io::Result<ServerReply> {
        self.call(&ClientRequest::Composition)
    }

    pub fn context(&mut self) -> io::Result<ServerReply> {
        self.call(&ClientRequest::Context)
    }

    pub fn write_world(&mut self, output: serde_json::Value) -> io::Result<ServerReply> {
        let token = self.auth()?;
        self.call(&ClientRequest::WriteWorld { token, output })
    }

    pub fn world(&mut self) -> io::Result<ServerReply> {
        self.call(&ClientRequest::World)
    }

    pub fn start_session(&mut self, session_type: SessionType) -> io::Result<ServerReply> {
        let token = self.auth()?;
        self.call(&ClientRequest::StartSession {
            token,
            session_type,
            title: None,
            pattern: None,
            output: None,
            position: None,
        })
    }

    pub fn join_session(&mut self, session_id: &SessionId) -> io::Result<ServerReply> {
        let token = self.auth()?;
        self.call(&ClientRequest::JoinSession {
            token,
            session_id: session_id.clone(),
            pattern: None,
            output: None,
        })
    }

    pub fn leave_session(&mut self) -> io::Result<ServerReply> {
        let token = self.auth()?;
        self.call(&ClientRequest::LeaveSession {
            token,
            session_id: None,
        })
    }

    pub fn wayfinding_action(&mut self, action: WayfindingAction) -> io::Result<ServerReply> {
        let token = self.auth()?;
        self.call(&ClientRequest::WayfindingAction { token, action })
    }

    pub fn wayfinding_state(&mut self) -> io::Result<ServerReply> {
        let token = self.auth()?;
        self.call(&ClientRequest::WayfindingState { token })
    }

    pub fn post_message(&mut self, content: &str, to: Option<AgentId>) -> io::Result<ServerReply> {
        let token = self.auth()?;
        self.call(&ClientRequest::PostMessage {
            token,
            content: content.to_string(),
            to,
        })
    }

    pub fn directives(&mut self) -> io::Result<ServerReply> {
        let token = self.auth()?;
        self.call(&ClientRequest::Directives { token })
    }

    /// Switch to stream mode. Consumes the client; the returned receiver
    /// yields every event frame (heartbeats are filtered out).
    pub fn subscribe(mut self) -> io::Result<Receiver<StreamEvent>> {
        write_message(&mut self.writer, &ClientRequest::Subscribe)?;
        let (tx, rx) = mpsc::channel();
        let mut reader = self.reader;
        thread::spawn(move || loop {
            match read_message::<_, ServerReply>(&mut reader) {
                Ok(ServerReply::Event { event, payload }) => {
                    if tx.send(StreamEvent { event, payload }).is_err() {
                        break;
                    }
                }
                Ok(ServerReply::Heartbeat) => {}
                Ok(_) => {}
                Err(_) => break,
            }
        });
        Ok(rx)
    }
}
