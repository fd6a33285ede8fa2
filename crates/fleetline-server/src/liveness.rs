//! Liveness pinger.
//!
//! Every interval the pinger queues a `PING` push on each registered session.
//! A session whose queue is closed (its writer hit a dead socket) or full
//! (the vehicle stopped reading) is removed from the fleet so the dispatcher
//! stops considering it. Vehicles are not
//! expected to answer pings.

use std::{sync::Arc, time::Duration};

use fleetline_core::{Environment, SessionId};
use fleetline_proto::ServerPush;
use tokio::sync::watch;

use crate::registry::FleetRegistry;

/// Default time between keepalive sweeps.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(5);

/// Keepalive settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessConfig {
    /// Time between sweeps
    pub interval: Duration,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self { interval: DEFAULT_PING_INTERVAL }
    }
}

/// Periodic keepalive and dead-session pruning.
pub struct LivenessPinger<E: Environment> {
    fleet: Arc<FleetRegistry>,
    env: E,
    config: LivenessConfig,
}

impl<E: Environment> LivenessPinger<E> {
    /// Create a pinger over `fleet`.
    pub fn new(fleet: Arc<FleetRegistry>, env: E, config: LivenessConfig) -> Self {
        Self { fleet, env, config }
    }

    /// Ping every registered session once. Returns the ids that were pruned.
    pub fn sweep(&self) -> Vec<SessionId> {
        let mut pruned = Vec::new();

        for session in self.fleet.snapshot() {
            if let Err(e) = session.send(ServerPush::Ping) {
                tracing::warn!(session_id = session.id(), error = %e, "keepalive failed, pruning");
                self.fleet.unregister(session.id());
                pruned.push(session.id());
            }
        }

        pruned
    }

    /// Sweep every interval until `shutdown` flips or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::debug!("liveness pinger started, interval {:?}", self.config.interval);

        loop {
            tokio::select! {
                () = self.env.sleep(self.config.interval) => {
                    let pruned = self.sweep();
                    if !pruned.is_empty() {
                        tracing::info!(
                            pruned = pruned.len(),
                            fleet_size = self.fleet.len(),
                            "pruned unreachable vehicles"
                        );
                    }
                },
                _ = shutdown.changed() => break,
            }
        }

        tracing::debug!("liveness pinger stopped");
    }
}
