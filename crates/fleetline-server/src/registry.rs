//! Fleet registry: the set of currently connected vehicle sessions.
//!
//! Connection tasks register on connect and unregister on disconnect. The
//! dispatcher and the liveness pinger take snapshots and work on those, so
//! they never hold the registry lock while talking to the network. Snapshot
//! order is registration order, which makes fallback selection and tie
//! breaking deterministic.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use fleetline_core::SessionId;
use thiserror::Error;

use crate::session::VehicleSession;

/// Errors registering a session.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// A session with this id is already registered.
    #[error("session {0:#018x} already registered")]
    DuplicateSession(SessionId),

    /// The fleet is at its configured size limit.
    #[error("fleet at capacity ({max} sessions)")]
    CapacityExceeded {
        /// Configured maximum
        max: usize,
    },
}

#[derive(Debug, Default)]
struct Membership {
    /// Session ID → session
    sessions: HashMap<SessionId, Arc<VehicleSession>>,
    /// Session IDs in registration order
    order: Vec<SessionId>,
}

/// Registry of connected vehicles.
#[derive(Debug)]
pub struct FleetRegistry {
    inner: Mutex<Membership>,
    max_sessions: usize,
}

impl Default for FleetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FleetRegistry {
    /// Create an empty registry with no size limit.
    pub fn new() -> Self {
        Self::with_max_sessions(usize::MAX)
    }

    /// Create an empty registry holding at most `max_sessions` sessions.
    pub fn with_max_sessions(max_sessions: usize) -> Self {
        Self { inner: Mutex::new(Membership::default()), max_sessions }
    }

    /// Add a session.
    pub fn register(&self, session: Arc<VehicleSession>) -> Result<(), RegistryError> {
        let mut inner = self.lock();
        let session_id = session.id();

        if inner.sessions.contains_key(&session_id) {
            return Err(RegistryError::DuplicateSession(session_id));
        }
        if inner.sessions.len() >= self.max_sessions {
            return Err(RegistryError::CapacityExceeded { max: self.max_sessions });
        }

        inner.sessions.insert(session_id, session);
        inner.order.push(session_id);
        Ok(())
    }

    /// Remove a session. Returns it if it was registered.
    ///
    /// Unregistering an absent session is a no-op, so the pinger and the
    /// connection task may both try.
    pub fn unregister(&self, session_id: SessionId) -> Option<Arc<VehicleSession>> {
        let mut inner = self.lock();
        let session = inner.sessions.remove(&session_id)?;
        inner.order.retain(|id| *id != session_id);
        Some(session)
    }

    /// Sessions registered at this instant, in registration order.
    pub fn snapshot(&self) -> Vec<Arc<VehicleSession>> {
        let inner = self.lock();
        inner.order.iter().filter_map(|id| inner.sessions.get(id)).cloned().collect()
    }

    /// Check if a session is registered.
    pub fn contains(&self, session_id: SessionId) -> bool {
        self.lock().sessions.contains_key(&session_id)
    }

    /// Look up a session.
    pub fn get(&self, session_id: SessionId) -> Option<Arc<VehicleSession>> {
        self.lock().sessions.get(&session_id).cloned()
    }

    /// Total number of registered sessions.
    pub fn len(&self) -> usize {
        self.lock().sessions.len()
    }

    /// Whether no sessions are registered.
    pub fn is_empty(&self) -> bool {
        self.lock().sessions.is_empty()
    }

    /// Configured size limit.
    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    fn lock(&self) -> MutexGuard<'_, Membership> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
