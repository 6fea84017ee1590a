//! TCP session server
//!
//! Owns the listener and runs one client session at a time on a dedicated
//! I/O thread. The scheduler stays the sole consumer of the command queue
//! and the sole producer of replies; the only shared state between the two
//! threads is a pair of bounded single-producer/single-consumer channels.
//!
//! Because at most one command is in flight (the session thread waits for
//! the reply before reading the next frame), both channels are bounded at
//! capacity one. Replies are tagged with a per-request serial so a reply
//! raced against a disconnect can never be delivered to the next session.

use super::messages::{ClientMessage, CommandRequest, ServerMessage, TickReply, PROTOCOL_VERSION};
use super::wire::{self, Serializer};
use super::SessionState;
use crate::config::WireFormat;
use crate::error::{Error, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, info, warn};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Read timeout slice; bounds how long shutdown can go unnoticed
const READ_SLICE: Duration = Duration::from_millis(500);

/// Deadline for the client to complete the handshake
const HANDSHAKE_DEADLINE: Duration = Duration::from_secs(10);

/// A command pulled off the wire, tagged for reply routing
#[derive(Debug)]
pub struct PendingRequest {
    pub serial: u64,
    pub request: CommandRequest,
}

/// Command server: listener + session I/O thread
pub struct CommandServer {
    local_addr: SocketAddr,
    request_rx: Receiver<PendingRequest>,
    reply_tx: Sender<(u64, TickReply)>,
    state: Arc<Mutex<SessionState>>,
    shutdown: Arc<AtomicBool>,
    accept_handle: Option<JoinHandle<()>>,
}

impl CommandServer {
    /// Bind the listener and spawn the acceptor thread
    pub fn bind(bind_address: &str, format: WireFormat) -> Result<Self> {
        let listener = TcpListener::bind(bind_address)
            .map_err(|e| Error::Config(format!("failed to bind {}: {}", bind_address, e)))?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let (request_tx, request_rx) = bounded::<PendingRequest>(1);
        let (reply_tx, reply_rx) = bounded::<(u64, TickReply)>(1);
        let state = Arc::new(Mutex::new(SessionState::Listening));
        let shutdown = Arc::new(AtomicBool::new(false));

        let thread_state = Arc::clone(&state);
        let thread_shutdown = Arc::clone(&shutdown);
        let accept_handle = thread::Builder::new()
            .name("session-io".to_string())
            .spawn(move || {
                accept_loop(
                    listener,
                    Serializer::new(format),
                    request_tx,
                    reply_rx,
                    thread_state,
                    thread_shutdown,
                );
            })?;

        info!("command server listening on {}", local_addr);

        Ok(Self {
            local_addr,
            request_rx,
            reply_tx,
            state,
            shutdown,
            accept_handle: Some(accept_handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// True while a handshaken client is attached
    pub fn connected(&self) -> bool {
        matches!(
            self.state(),
            SessionState::Connected | SessionState::AwaitingCommand | SessionState::Replying
        )
    }

    /// Wait up to `timeout` for the session thread to hand over a command
    pub fn poll_request(&self, timeout: Duration) -> Option<PendingRequest> {
        if timeout.is_zero() {
            self.request_rx.try_recv().ok()
        } else {
            self.request_rx.recv_timeout(timeout).ok()
        }
    }

    /// Route a reply back to the session that submitted `serial`.
    ///
    /// Dropped silently if the session is gone; the client that asked no
    /// longer exists.
    pub fn send_reply(&self, serial: u64, reply: TickReply) {
        if self.reply_tx.try_send((serial, reply)).is_err() {
            debug!("dropping reply for serial {}: session gone", serial);
        }
    }

    /// Stop the acceptor thread and tear down any active session
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

impl Drop for CommandServer {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(handle) = self.accept_handle.take() {
            let _ = handle.join();
        }
    }
}

fn set_state(state: &Arc<Mutex<SessionState>>, next: SessionState) {
    *state.lock().unwrap_or_else(|e| e.into_inner()) = next;
}

/// Acceptor loop: sessions are strictly sequential, one client at a time
fn accept_loop(
    listener: TcpListener,
    serializer: Serializer,
    request_tx: Sender<PendingRequest>,
    reply_rx: Receiver<(u64, TickReply)>,
    state: Arc<Mutex<SessionState>>,
    shutdown: Arc<AtomicBool>,
) {
    let mut next_serial: u64 = 0;

    while !shutdown.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, addr)) => {
                info!("client connected: {}", addr);
                set_state(&state, SessionState::Connected);

                let result = run_session(
                    stream,
                    &serializer,
                    &request_tx,
                    &reply_rx,
                    &state,
                    &shutdown,
                    &mut next_serial,
                );
                match result {
                    Ok(()) => info!("client disconnected: {}", addr),
                    Err(e) => warn!("session closed: {}", e),
                }

                set_state(&state, SessionState::Closed);
                // Back to listening; the simulation keeps running
                set_state(&state, SessionState::Listening);
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(10));
            }
            Err(e) => {
                warn!("accept error: {}", e);
                thread::sleep(Duration::from_millis(100));
            }
        }
    }

    set_state(&state, SessionState::Closed);
    debug!("session thread exiting");
}

/// Drive one client session from handshake to disconnect
fn run_session(
    mut stream: TcpStream,
    serializer: &Serializer,
    request_tx: &Sender<PendingRequest>,
    reply_rx: &Receiver<(u64, TickReply)>,
    state: &Arc<Mutex<SessionState>>,
    shutdown: &Arc<AtomicBool>,
    next_serial: &mut u64,
) -> Result<()> {
    stream.set_read_timeout(Some(READ_SLICE))?;
    let mut buffer = Vec::with_capacity(256);

    handshake(&mut stream, serializer, &mut buffer, shutdown)?;
    set_state(state, SessionState::AwaitingCommand);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            return Ok(());
        }

        let msg = match wire::read_message::<_, ClientMessage>(&mut stream, serializer, &mut buffer)
        {
            Ok(Some(msg)) => msg,
            Ok(None) => continue, // read slice elapsed, no frame yet
            Err(Error::Io(e)) if is_disconnect(&e) => return Ok(()),
            Err(e) => {
                // Malformed frame: report, then close the session
                let notice = ServerMessage::Error {
                    message: e.to_string(),
                };
                let _ = wire::write_message(&mut stream, serializer, &notice);
                return Err(e);
            }
        };

        match msg {
            ClientMessage::Request(request) => {
                *next_serial += 1;
                let serial = *next_serial;

                // Drop any reply stranded by a dead predecessor session
                while reply_rx.try_recv().is_ok() {}

                set_state(state, SessionState::Replying);
                if request_tx.send(PendingRequest { serial, request }).is_err() {
                    return Err(Error::Protocol("scheduler gone".to_string()));
                }

                let reply = wait_for_reply(reply_rx, serial, shutdown)?;
                wire::write_message(&mut stream, serializer, &ServerMessage::Reply(reply))?;
                set_state(state, SessionState::AwaitingCommand);
            }
            ClientMessage::Bye => return Ok(()),
            ClientMessage::Hello { .. } => {
                return Err(Error::Protocol("duplicate handshake".to_string()));
            }
        }
    }
}

/// Expect `Hello`, answer `Welcome`; anything else closes the session
fn handshake(
    stream: &mut TcpStream,
    serializer: &Serializer,
    buffer: &mut Vec<u8>,
    shutdown: &Arc<AtomicBool>,
) -> Result<()> {
    let deadline = Instant::now() + HANDSHAKE_DEADLINE;

    loop {
        if shutdown.load(Ordering::Relaxed) {
            return Err(Error::Protocol("shutdown during handshake".to_string()));
        }
        if Instant::now() > deadline {
            return Err(Error::Protocol("handshake timed out".to_string()));
        }

        match wire::read_message::<_, ClientMessage>(stream, serializer, buffer) {
            Ok(Some(ClientMessage::Hello { version })) => {
                if version != PROTOCOL_VERSION {
                    let notice = ServerMessage::Error {
                        message: format!(
                            "unsupported protocol version {} (server speaks {})",
                            version, PROTOCOL_VERSION
                        ),
                    };
                    let _ = wire::write_message(stream, serializer, &notice);
                    return Err(Error::Protocol(format!(
                        "version mismatch: client {}",
                        version
                    )));
                }
                let welcome = ServerMessage::Welcome {
                    version: PROTOCOL_VERSION,
                };
                wire::write_message(stream, serializer, &welcome)?;
                return Ok(());
            }
            Ok(Some(other)) => {
                return Err(Error::Protocol(format!(
                    "expected Hello, got {:?}",
                    other
                )));
            }
            Ok(None) => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Block (in bounded slices) until the scheduler replies to `serial`
fn wait_for_reply(
    reply_rx: &Receiver<(u64, TickReply)>,
    serial: u64,
    shutdown: &Arc<AtomicBool>,
) -> Result<TickReply> {
    loop {
        if shutdown.load(Ordering::Relaxed) {
            return Err(Error::Protocol("shutdown while replying".to_string()));
        }
        match reply_rx.recv_timeout(READ_SLICE) {
            Ok((s, reply)) if s == serial => return Ok(reply),
            Ok((s, _)) => debug!("discarding stale reply for serial {}", s),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                return Err(Error::Protocol("scheduler gone".to_string()));
            }
        }
    }
}

fn is_disconnect(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::ConnectionAborted
    )
}
