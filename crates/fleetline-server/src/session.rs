//! Live vehicle sessions.
//!
//! A [`VehicleSession`] pairs the vehicle's [`VehicleState`] with the sending
//! half of its outbound queue. The connection task owns the receiving half and
//! is the only writer to the socket, so replies, keepalives and ride requests
//! from any task come out as whole lines in the order they were queued.
//!
//! The queue is bounded. Replies wait for room, so a vehicle that stops
//! reading stops being read. Pushes never wait: a full queue fails the push
//! and the pinger treats that vehicle as unreachable.
//!
//! State lives behind a `std::sync::Mutex`. Every critical section is a short
//! read or write of in-memory data and never spans an `.await`.

use std::sync::{Mutex, MutexGuard, PoisonError};

use fleetline_core::{CostingSnapshot, SessionId, VehicleState};
use fleetline_proto::{OutboundMessage, Point, Stop};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Messages a session may have queued but not yet written.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Errors delivering to a session.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// The connection task has gone away; nothing will reach the vehicle.
    #[error("session {0:#018x} is closed")]
    Closed(SessionId),

    /// The vehicle has stopped reading and its queue is full.
    #[error("session {0:#018x} outbound queue is full")]
    Backlogged(SessionId),
}

/// One connected vehicle.
pub struct VehicleSession {
    id: SessionId,
    connected_at: u64,
    state: Mutex<VehicleState>,
    outbound: mpsc::Sender<OutboundMessage>,
}

impl VehicleSession {
    /// Create a session and the receiver its connection task drains.
    ///
    /// `connected_at` is wall-clock seconds, for status reporting only.
    pub fn new(
        id: SessionId,
        connected_at: u64,
    ) -> (Self, mpsc::Receiver<OutboundMessage>) {
        let (outbound, receiver) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let session = Self { id, connected_at, state: Mutex::new(VehicleState::new()), outbound };
        (session, receiver)
    }

    /// Session identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Wall-clock seconds at which the vehicle connected.
    pub fn connected_at(&self) -> u64 {
        self.connected_at
    }

    /// Record a position report.
    pub fn update_location(&self, location: Point, time: f64) {
        self.state().update_location(location, time);
    }

    /// Append a stop to the route.
    pub fn append_stop(&self, stop: Stop) {
        self.state().append_stop(stop);
    }

    /// Remove the first exactly-equal stop. Returns whether one was removed.
    pub fn remove_stop(&self, stop: &Stop) -> bool {
        self.state().remove_stop(stop)
    }

    /// Head of the route.
    pub fn peek_next_stop(&self) -> Option<Stop> {
        self.state().peek_next_stop()
    }

    /// Detached copy for the matcher, `None` until a location is known.
    pub fn snapshot_for_costing(&self) -> Option<CostingSnapshot> {
        self.state().snapshot_for_costing()
    }

    /// Copy of the whole vehicle state.
    pub fn state_snapshot(&self) -> VehicleState {
        self.state().clone()
    }

    /// Queue a message for the vehicle without waiting.
    pub fn send(&self, message: impl Into<OutboundMessage>) -> Result<(), SessionError> {
        self.outbound.try_send(message.into()).map_err(|e| match e {
            TrySendError::Full(_) => SessionError::Backlogged(self.id),
            TrySendError::Closed(_) => SessionError::Closed(self.id),
        })
    }

    /// Queue a reply, waiting while the queue is full.
    pub async fn reply(&self, message: impl Into<OutboundMessage>) -> Result<(), SessionError> {
        self.outbound.send(message.into()).await.map_err(|_| SessionError::Closed(self.id))
    }

    /// Whether the connection task has stopped draining the queue.
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }

    fn state(&self) -> MutexGuard<'_, VehicleState> {
        // State updates are single assignments or Vec operations, a panic
        // mid-update cannot leave it torn.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for VehicleSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VehicleSession")
            .field("id", &format_args!("{:#018x}", self.id))
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
