//! Socket Transport.
//!
//! Holds one TCP connection to the engine's loopback endpoint and runs a
//! request/response exchange per push: the snapshot goes out as a single JSON
//! document, and the reply is accumulated until it forms a complete JSON
//! value, stops being a JSON prefix, the peer closes, or the response deadline
//! passes. A reply cut short by the deadline closes the connection, so
//! its tail can never be read as the answer to the next push.
//!
//! A connection that breaks while waiting is reopened with its own retry
//! budget and the same snapshot is sent once more. The engine may be
//! restarted when reconnecting keeps failing.

use super::retry::RetryPolicy;
use super::supervisor::EngineSupervisor;
use super::BackendTransport;
use crate::common::TransportError;
use crate::config::{RetryConfig, SocketConfig};
use crate::documents::Snapshot;
use crate::stats::ResultsDocument;
use serde::de::IgnoredAny;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::{Duration, Instant};

const READ_CHUNK: usize = 64 * 1024;

/// Connection state of the socket client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SocketState {
    Disconnected,
    Connecting,
    Connected,
    Sending,
    AwaitingResponse,
    Reconnecting,
}

/// Why an exchange did not produce a reply.
#[derive(Debug)]
enum Exchange {
    PeerClosed,
    Broken(io::Error),
    Timeout,
    /// The reply can never become a JSON document.
    Malformed { reason: String, closed: bool },
}

/// How far the bytes received so far get towards one JSON value.
#[derive(Debug, PartialEq)]
enum Framing {
    Complete,
    Partial,
    Invalid(String),
}

/// Request/response client over a persistent TCP connection.
pub struct SocketTransport {
    endpoint: String,
    connect_policy: RetryPolicy,
    reconnect_policy: RetryPolicy,
    response_deadline: Duration,
    poll_interval: Duration,
    restart_after_failures: u32,
    supervisor: Option<EngineSupervisor>,
    stream: Option<TcpStream>,
    state: SocketState,
}

impl SocketTransport {
    /// Creates a disconnected client.
    ///
    /// # Arguments
    ///
    /// * `config` - Endpoint, deadlines and retry budgets
    /// * `retry` - Shared backoff settings
    /// * `supervisor` - Engine process to launch and restart, if the console owns it
    pub fn new(
        config: &SocketConfig,
        retry: &RetryConfig,
        supervisor: Option<EngineSupervisor>,
    ) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            connect_policy: config.connect_policy(retry),
            reconnect_policy: config.reconnect_policy(retry),
            response_deadline: config.response_deadline(),
            poll_interval: config.poll_interval(),
            restart_after_failures: config.restart_after_failures,
            supervisor,
            stream: None,
            state: SocketState::Disconnected,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> SocketState {
        self.state
    }

    /// Loopback address of the engine, as `host:port`.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Engine process owned by this client, if any.
    pub fn supervisor(&self) -> Option<&EngineSupervisor> {
        self.supervisor.as_ref()
    }

    fn set_state(&mut self, state: SocketState) {
        if self.state != state {
            log::debug!("socket {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    /// Opens the connection if it is not already open.
    ///
    /// Launches the engine first when a supervisor is attached. Exhausting the
    /// connect budget yields `ConnectionFailed`.
    pub fn connect(&mut self) -> Result<(), TransportError> {
        if self.stream.is_some() {
            return Ok(());
        }
        if let Some(supervisor) = self.supervisor.as_mut() {
            supervisor.ensure_running(false)?;
        }

        self.set_state(SocketState::Connecting);
        let endpoint = self.endpoint.clone();
        match self.connect_policy.start().run(|_| dial(&endpoint)) {
            Ok(stream) => {
                log::info!("connected to engine at {}", endpoint);
                self.stream = Some(stream);
                self.set_state(SocketState::Connected);
                Ok(())
            }
            Err(e) => {
                self.set_state(SocketState::Disconnected);
                log::error!("could not connect to {}: {}", endpoint, e.last);
                Err(TransportError::ConnectionFailed {
                    endpoint,
                    attempts: e.attempts,
                })
            }
        }
    }

    /// Drops the current connection and dials again with the reconnect budget.
    ///
    /// # Returns
    ///
    /// The number of dials it took to get a connection back.
    fn reconnect(&mut self) -> Result<u32, TransportError> {
        self.close();
        self.set_state(SocketState::Reconnecting);

        let endpoint = self.endpoint.clone();
        let restart_after = self.restart_after_failures;
        let supervisor = &mut self.supervisor;
        let mut restarted = false;
        let mut dials = 0;

        let outcome = self.reconnect_policy.start().run(|attempt| {
            dials = attempt;
            if restart_after > 0 && attempt > restart_after && !restarted {
                if let Some(supervisor) = supervisor.as_mut() {
                    log::warn!("restarting engine after {} failed reconnects", restart_after);
                    restarted = true;
                    supervisor.ensure_running(true)?;
                }
            }
            dial(&endpoint).map_err(TransportError::from)
        });

        match outcome {
            Ok(stream) => {
                log::info!("reconnected to engine at {} after {} dial(s)", endpoint, dials);
                self.stream = Some(stream);
                self.set_state(SocketState::Connected);
                Ok(dials)
            }
            Err(e) => {
                self.set_state(SocketState::Disconnected);
                match e.last {
                    TransportError::EngineUnavailable(reason) => {
                        Err(TransportError::EngineUnavailable(reason))
                    }
                    _ => Err(TransportError::ConnectionFailed {
                        endpoint,
                        attempts: e.attempts,
                    }),
                }
            }
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        self.set_state(SocketState::Disconnected);
    }

    /// Writes `payload` and collects the reply.
    fn exchange(&mut self, payload: &[u8]) -> Result<Vec<u8>, Exchange> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(Exchange::PeerClosed);
        };

        discard_stale(stream)?;

        self.state = SocketState::Sending;
        stream
            .write_all(payload)
            .and_then(|_| stream.flush())
            .map_err(Exchange::Broken)?;

        self.state = SocketState::AwaitingResponse;
        stream
            .set_read_timeout(Some(self.poll_interval))
            .map_err(Exchange::Broken)?;

        let deadline = Instant::now() + self.response_deadline;
        let mut reply = Vec::new();
        let mut chunk = vec![0u8; READ_CHUNK];
        while Instant::now() < deadline {
            match stream.read(&mut chunk) {
                Ok(0) => {
                    return match framing(&reply) {
                        Framing::Complete => Ok(reply),
                        Framing::Partial => Err(Exchange::PeerClosed),
                        Framing::Invalid(reason) => Err(Exchange::Malformed {
                            reason,
                            closed: true,
                        }),
                    }
                }
                Ok(n) => {
                    reply.extend_from_slice(&chunk[..n]);
                    match framing(&reply) {
                        Framing::Complete => return Ok(reply),
                        Framing::Partial => {}
                        Framing::Invalid(reason) => {
                            return Err(Exchange::Malformed {
                                reason,
                                closed: false,
                            })
                        }
                    }
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                    ) => {}
                Err(e) => return Err(Exchange::Broken(e)),
            }
        }

        if !reply.is_empty() {
            log::warn!("deadline passed with {} byte(s) of an unfinished reply", reply.len());
        }
        Err(Exchange::Timeout)
    }
}

impl BackendTransport for SocketTransport {
    fn name(&self) -> &str {
        "socket"
    }

    fn push(&mut self, snapshot: &Snapshot) -> Result<ResultsDocument, TransportError> {
        let payload = serde_json::to_vec(snapshot).map_err(io::Error::from)?;
        self.connect()?;

        let mut resent = false;
        let mut connections = 1;
        loop {
            match self.exchange(&payload) {
                Ok(reply) => {
                    self.set_state(SocketState::Connected);
                    log::debug!("received {} byte reply", reply.len());
                    return ResultsDocument::from_slice(&reply);
                }
                Err(Exchange::Timeout) => {
                    self.close();
                    return Err(TransportError::Timeout(self.response_deadline));
                }
                Err(Exchange::Malformed { reason, closed }) => {
                    if closed {
                        self.close();
                    } else {
                        self.set_state(SocketState::Connected);
                    }
                    log::warn!("engine reply is not JSON: {}", reason);
                    return Err(TransportError::InvalidResponse(reason));
                }
                Err(failure) if !resent => {
                    log::warn!("connection lost during exchange ({:?}); resending", failure);
                    connections += self.reconnect()?;
                    resent = true;
                }
                Err(Exchange::Broken(e)) => {
                    self.close();
                    return Err(TransportError::Io(e));
                }
                Err(Exchange::PeerClosed) => {
                    self.close();
                    return Err(TransportError::ConnectionFailed {
                        endpoint: self.endpoint.clone(),
                        attempts: connections,
                    });
                }
            }
        }
    }

    fn shutdown(&mut self) {
        self.close();
        if let Some(supervisor) = self.supervisor.as_mut() {
            supervisor.terminate();
        }
    }
}

fn dial(endpoint: &str) -> io::Result<TcpStream> {
    let stream = TcpStream::connect(endpoint)?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Drops bytes left on the connection by an earlier, abandoned reply.
fn discard_stale(stream: &mut TcpStream) -> Result<(), Exchange> {
    stream.set_nonblocking(true).map_err(Exchange::Broken)?;
    let mut chunk = [0u8; 4096];
    let outcome = loop {
        match stream.read(&mut chunk) {
            Ok(0) => break Err(Exchange::PeerClosed),
            Ok(n) => log::debug!("discarding {} stale byte(s)", n),
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) if e.kind() == ErrorKind::WouldBlock => break Ok(()),
            Err(e) => break Err(Exchange::Broken(e)),
        }
    };
    stream.set_nonblocking(false).map_err(Exchange::Broken)?;
    outcome
}

/// Classifies the bytes received so far.
///
/// Running out of input means more may follow; any other parse error means
/// the reply is not JSON at all.
fn framing(bytes: &[u8]) -> Framing {
    if bytes.is_empty() {
        return Framing::Partial;
    }
    match serde_json::from_slice::<IgnoredAny>(bytes) {
        Ok(_) => Framing::Complete,
        Err(e) if e.is_eof() => Framing::Partial,
        Err(e) => Framing::Invalid(e.to_string()),
    }
}
