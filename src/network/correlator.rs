//! Request/Response Correlator
//!
//! The protocol carries no transaction IDs, so a reply is simply the next
//! frame read after a request was written. This only works with at most one
//! request in flight:
//!
//! - `begin()` takes the flight lock, serializing callers
//! - `Flight::arm()` sets the pending marker right before the write
//! - the read loop calls `dispatch()`; the first frame after arming goes to
//!   the waiter, anything else goes to the observer
//!
//! The marker is tagged with the connection generation it was armed on, so
//! a frame read on one connection never satisfies a request written on
//! another.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::{Mutex, MutexGuard};

use crate::error::{Result, SwitchError};
use crate::protocol::Frame;

/// Receives frames nobody asked for (device-initiated status pushes)
///
/// Runs on the read loop thread; must not block.
pub type Observer = Arc<dyn Fn(Frame) + Send + Sync>;

/// Where a dispatched frame ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the waiting caller
    Waiter,

    /// Handed to the unsolicited-frame observer
    Observer,

    /// Nobody wanted it
    Dropped,
}

struct Pending {
    token: u64,
    generation: u64,
    tx: Sender<Frame>,
}

/// Pairs written requests with the next inbound frame
pub struct Correlator {
    /// Held for the whole set-marker/write/await sequence
    flight: Mutex<()>,

    /// The pending request marker
    pending: Mutex<Option<Pending>>,

    next_token: AtomicU64,

    observer: Option<Observer>,
}

impl Correlator {
    pub fn new(observer: Option<Observer>) -> Self {
        Self {
            flight: Mutex::new(()),
            pending: Mutex::new(None),
            next_token: AtomicU64::new(0),
            observer,
        }
    }

    /// Start a request, waiting for any other request to finish first
    pub fn begin(&self) -> Flight<'_> {
        Flight {
            correlator: self,
            _guard: self.flight.lock(),
            armed: None,
        }
    }

    /// Route a frame read on connection `generation`
    pub fn dispatch(&self, generation: u64, frame: Frame) -> Delivery {
        let waiter = {
            let mut pending = self.pending.lock();
            match pending.as_ref().map(|p| p.generation) {
                Some(armed) if armed == generation => pending.take(),
                Some(armed) => {
                    tracing::debug!(
                        "Pending request belongs to connection {}, frame came from {}",
                        armed,
                        generation
                    );
                    None
                }
                None => None,
            }
        };

        if let Some(waiter) = waiter {
            if waiter.tx.try_send(frame).is_ok() {
                return Delivery::Waiter;
            }
            // The caller gave up between our take and the send
            tracing::debug!("Waiter left before frame {} arrived", frame);
        }

        match &self.observer {
            Some(observer) => {
                tracing::debug!("Unsolicited frame: {}", frame);
                observer(frame);
                Delivery::Observer
            }
            None => {
                tracing::debug!("Dropping unsolicited frame: {}", frame);
                Delivery::Dropped
            }
        }
    }

    /// Fail the waiter armed on `generation`, if any
    ///
    /// Dropping the sender wakes the waiter with `ConnectionLost`.
    pub fn fail_generation(&self, generation: u64) -> bool {
        let mut pending = self.pending.lock();
        if matches!(pending.as_ref(), Some(p) if p.generation == generation) {
            pending.take();
            true
        } else {
            false
        }
    }

    /// Fail any waiter
    pub fn fail_all(&self) -> bool {
        self.pending.lock().take().is_some()
    }

    /// Whether a caller is awaiting a frame
    pub fn is_pending(&self) -> bool {
        self.pending.lock().is_some()
    }
}

/// One request's hold on the correlator
///
/// Dropping it releases the flight lock and clears its marker if still set,
/// so a late reply goes to the observer instead of the next caller.
pub struct Flight<'a> {
    correlator: &'a Correlator,
    _guard: MutexGuard<'a, ()>,
    armed: Option<(u64, Receiver<Frame>)>,
}

impl Flight<'_> {
    /// Set the pending marker for a write about to happen on `generation`
    pub fn arm(&mut self, generation: u64) {
        let (tx, rx) = channel::bounded(1);
        let token = self.correlator.next_token.fetch_add(1, Ordering::Relaxed);

        *self.correlator.pending.lock() = Some(Pending {
            token,
            generation,
            tx,
        });
        self.armed = Some((token, rx));
    }

    /// Wait for the reply to the armed request
    pub fn wait(self, timeout: Duration) -> Result<Frame> {
        let Some((_, rx)) = self.armed.as_ref() else {
            return Err(SwitchError::NotConnected);
        };

        match rx.recv_timeout(timeout) {
            Ok(frame) => Ok(frame),
            Err(RecvTimeoutError::Timeout) => {
                // Delivered right as the timer fired
                if let Ok(frame) = rx.try_recv() {
                    return Ok(frame);
                }
                Err(SwitchError::ResponseTimeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(SwitchError::ConnectionLost),
        }
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        if let Some((token, _)) = self.armed.take() {
            let mut pending = self.correlator.pending.lock();
            if matches!(pending.as_ref(), Some(p) if p.token == token) {
                pending.take();
            }
        }
    }
}
