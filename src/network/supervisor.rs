//! Connection Supervisor
//!
//! Owns the one live connection to the switch and keeps it alive.
//!
//! ## State Machine
//! ```text
//! Disconnected ──► Connecting ──► Connected ──► Faulted
//!                      ▲                           │
//!                      └───────────────────────────┘
//!              (any state) ── shutdown ──► Closed
//! ```
//!
//! A single supervisor thread runs the read loop for the current connection
//! and, when it faults, the redial loop. It is the only writer of the
//! connection state. Callers write through the shared write half.
//!
//! ## Fault Detection
//! The socket has a short read deadline. An expired deadline is an idle
//! link; EOF or a hard read error is a dead one. A failed write shuts the
//! socket down so the read loop sees the fault too.

use std::net::TcpStream;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::{Condvar, Mutex};

use crate::config::Config;
use crate::error::{Result, SwitchError};
use crate::protocol::{Frame, FrameReader, ReadOutcome};
use super::connection::{Connection, ConnectionWriter};
use super::correlator::Correlator;

/// Lifecycle state of the link to the switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never connected (initial dial failed)
    Disconnected,

    /// Dialing, or waiting to redial
    Connecting,

    /// A connection is live
    Connected,

    /// The live connection just died; teardown in progress
    Faulted,

    /// Shut down; no further reconnects
    Closed,
}

/// Write half of the current connection, tagged with its generation
struct Link {
    generation: u64,
    writer: ConnectionWriter,
}

/// State shared between callers and the supervisor thread
struct Shared {
    config: Config,
    state: Mutex<ConnectionState>,
    state_changed: Condvar,
    link: Mutex<Option<Link>>,
    correlator: Arc<Correlator>,
}

impl Shared {
    fn set_state(&self, next: ConnectionState) {
        let mut state = self.state.lock();
        if *state != next {
            tracing::debug!("Connection state {:?} -> {:?}", *state, next);
            *state = next;
            self.state_changed.notify_all();
        }
    }

    fn install(&self, generation: u64, writer: ConnectionWriter) {
        *self.link.lock() = Some(Link { generation, writer });
        self.set_state(ConnectionState::Connected);
    }

    /// Close the connection of `generation` and fail its waiter
    fn teardown(&self, generation: u64) {
        let dead = {
            let mut link = self.link.lock();
            if matches!(link.as_ref(), Some(l) if l.generation == generation) {
                link.take()
            } else {
                None
            }
        };
        if let Some(dead) = dead {
            dead.writer.close();
        }

        if self.correlator.fail_generation(generation) {
            tracing::warn!("Failing in-flight request on connection {}", generation);
        }
    }
}

/// Keeps exactly one connection to the switch alive
pub struct Supervisor {
    shared: Arc<Shared>,

    /// Dropped to signal shutdown
    shutdown_tx: Mutex<Option<Sender<()>>>,

    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Supervisor {
    /// Dial the switch and start the supervisor thread
    ///
    /// Failure of this first dial is returned; later faults are handled by
    /// reconnecting.
    pub fn start(config: Config, correlator: Arc<Correlator>) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(Shared {
            config,
            state: Mutex::new(ConnectionState::Connecting),
            state_changed: Condvar::new(),
            link: Mutex::new(None),
            correlator,
        });

        tracing::info!("Connecting to {}", shared.config.addr);
        let (reader, writer) = match Connection::dial(&shared.config).and_then(Connection::split) {
            Ok(halves) => halves,
            Err(e) => {
                tracing::error!("Failed to dial {}: {}", shared.config.addr, e);
                shared.set_state(ConnectionState::Disconnected);
                return Err(e);
            }
        };

        let generation = 1;
        tracing::info!("Connected to {}", writer.peer_addr());
        shared.install(generation, writer);

        let (shutdown_tx, shutdown_rx) = channel::bounded(0);
        let worker = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("tesmart-supervisor".to_string())
            .spawn(move || supervise(worker, reader, generation, shutdown_rx))?;

        Ok(Self {
            shared,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Write a frame on the current connection
    pub fn send(&self, frame: &Frame) -> Result<u64> {
        self.send_with(frame, |_| {})
    }

    /// Write a frame, calling `before_write` with the connection generation
    /// first
    ///
    /// `before_write` runs while the connection cannot be swapped out, which
    /// is where a pending request marker must be set. Returns the generation
    /// the frame went out on.
    pub fn send_with(&self, frame: &Frame, before_write: impl FnOnce(u64)) -> Result<u64> {
        let mut link = self.shared.link.lock();
        let Some(active) = link.as_mut() else {
            return Err(match self.state() {
                ConnectionState::Closed => SwitchError::Shutdown,
                _ => SwitchError::NotConnected,
            });
        };

        let generation = active.generation;
        before_write(generation);

        match active.writer.send(frame) {
            Ok(()) => Ok(generation),
            Err(e @ SwitchError::ShortWrite { .. }) => {
                tracing::warn!("Failed to send {}: {}", frame, e);
                Err(e)
            }
            Err(e) => {
                tracing::warn!("Failed to send {}: {}", frame, e);
                // The read loop notices the closed socket and reconnects
                if let Some(dead) = link.take() {
                    dead.writer.close();
                }
                self.shared.set_state(ConnectionState::Faulted);
                Err(e)
            }
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.lock()
    }

    /// Generation of the live connection, if any
    ///
    /// Starts at 1 and increases by one on every reconnect.
    pub fn generation(&self) -> Option<u64> {
        self.shared.link.lock().as_ref().map(|l| l.generation)
    }

    /// Block until the state equals `target` or `timeout` passes
    pub fn wait_for_state(&self, target: ConnectionState, timeout: Duration) -> bool {
        let mut state = self.shared.state.lock();
        if *state != target {
            self.shared
                .state_changed
                .wait_while_for(&mut state, |s| *s != target, timeout);
        }
        *state == target
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Stop the read loop and prevent further reconnects
    ///
    /// Idempotent. Blocks until the supervisor thread exits unless called
    /// from that thread (e.g. from an observer).
    pub fn shutdown(&self) {
        let Some(tx) = self.shutdown_tx.lock().take() else {
            return;
        };
        drop(tx);
        tracing::info!("Shutting down connection to {}", self.shared.config.addr);

        // Wake the read loop now rather than at its next deadline
        if let Some(link) = self.shared.link.lock().as_ref() {
            link.writer.close();
        }

        if let Some(handle) = self.handle.lock().take() {
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                tracing::error!("Supervisor thread panicked");
            }
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// =============================================================================
// Supervisor Thread
// =============================================================================

/// Why a read loop ended
enum LinkEnd {
    Faulted,
    Shutdown,
}

fn shutdown_requested(shutdown_rx: &Receiver<()>) -> bool {
    !matches!(shutdown_rx.try_recv(), Err(TryRecvError::Empty))
}

fn supervise(
    shared: Arc<Shared>,
    mut reader: FrameReader<TcpStream>,
    mut generation: u64,
    shutdown_rx: Receiver<()>,
) {
    let mut backoff = Backoff::new(&shared.config);

    'supervise: loop {
        if let LinkEnd::Shutdown = read_loop(&shared, &mut reader, generation, &shutdown_rx) {
            break 'supervise;
        }

        shared.set_state(ConnectionState::Faulted);
        shared.teardown(generation);
        shared.set_state(ConnectionState::Connecting);

        reader = loop {
            if shutdown_requested(&shutdown_rx) {
                break 'supervise;
            }

            tracing::info!("Reconnecting to {}", shared.config.addr);
            match Connection::dial(&shared.config).and_then(Connection::split) {
                Ok((reader, writer)) => {
                    generation += 1;
                    backoff.reset();
                    tracing::info!(
                        generation,
                        "Reconnected to {}",
                        writer.peer_addr()
                    );
                    shared.install(generation, writer);
                    break reader;
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    tracing::warn!(
                        "Reconnect to {} failed: {}; retrying in {:?}",
                        shared.config.addr,
                        e,
                        delay
                    );
                    match shutdown_rx.recv_timeout(delay) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        _ => break 'supervise,
                    }
                }
            }
        };
    }

    let last = shared.link.lock().take();
    if let Some(link) = last {
        link.writer.close();
    }
    if shared.correlator.fail_all() {
        tracing::debug!("Failed in-flight request on shutdown");
    }
    shared.set_state(ConnectionState::Closed);
    tracing::info!("Connection to {} closed", shared.config.addr);
}

/// Feed frames to the correlator until the connection dies or shutdown
fn read_loop(
    shared: &Shared,
    reader: &mut FrameReader<TcpStream>,
    generation: u64,
    shutdown_rx: &Receiver<()>,
) -> LinkEnd {
    loop {
        if shutdown_requested(shutdown_rx) {
            return LinkEnd::Shutdown;
        }

        match reader.read_frame() {
            Ok(ReadOutcome::Frame(frame)) => {
                tracing::debug!("Received on connection {}: {}", generation, frame);
                shared.correlator.dispatch(generation, frame);
            }
            Ok(ReadOutcome::Idle) => continue,
            Ok(ReadOutcome::Closed) => {
                if shutdown_requested(shutdown_rx) {
                    return LinkEnd::Shutdown;
                }
                if reader.buffered() > 0 {
                    tracing::debug!("Discarding {} bytes of a partial frame", reader.buffered());
                }
                tracing::warn!("Connection {} closed by {}", generation, shared.config.addr);
                return LinkEnd::Faulted;
            }
            Err(e) => {
                if shutdown_requested(shutdown_rx) {
                    return LinkEnd::Shutdown;
                }
                tracing::warn!("Failed to read from socket: {}", e);
                return LinkEnd::Faulted;
            }
        }
    }
}

// =============================================================================
// Backoff
// =============================================================================

/// Exponential redial delay, reset after every successful connect
struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    fn new(config: &Config) -> Self {
        let initial = Duration::from_millis(config.reconnect_initial_backoff_ms);
        Self {
            initial,
            max: Duration::from_millis(config.reconnect_max_backoff_ms),
            current: initial,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    fn reset(&mut self) {
        self.current = self.initial;
    }
}
