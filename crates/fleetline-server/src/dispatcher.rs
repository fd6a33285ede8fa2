//! Ride dispatch.
//!
//! [`Dispatcher::request_ride`] snapshots the fleet, prices every vehicle with
//! a known location through the matcher, and pushes a `RIDE_REQUEST` to the
//! chosen one. The dispatcher never edits routes: a vehicle that accepts the
//! ride reports the new stops itself with `STOP_RECVD`.
//!
//! # Stale winners
//!
//! Matching takes as long as the slowest oracle query. The winner may
//! disconnect in the meantime; before pushing, the dispatcher checks that it
//! is still registered. A vanished winner is not replaced: the assignment is
//! reported with `delivered == false` and the passenger still gets the
//! location that was matched.

use std::sync::Arc;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use fleetline_core::{
    Candidate, CostingSnapshot, Environment, RoutingOracle, SessionId, TripCost, find_optimal,
};
use fleetline_proto::{Point, ServerPush};
use serde::Serialize;
use thiserror::Error;

use crate::{registry::FleetRegistry, session::VehicleSession};

/// What to do when no vehicle has a finite cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Assign the first eligible vehicle in registration order anyway.
    #[default]
    FirstEligible,
    /// Refuse the ride.
    Reject,
}

/// Errors dispatching a ride.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// No connected vehicle has reported a location.
    #[error("no vehicle available")]
    NoVehicleAvailable,

    /// Vehicles exist but none could be routed, and fallback is disabled.
    #[error("no vehicle can reach the pickup")]
    NoFeasibleVehicle,
}

impl DispatchError {
    /// HTTP status for this error.
    pub const fn code(&self) -> StatusCode {
        match self {
            Self::NoVehicleAvailable | Self::NoFeasibleVehicle => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        (self.code(), Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

/// Result of a successful dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assignment {
    /// Chosen vehicle
    pub session_id: SessionId,
    /// Vehicle location at match time
    pub location: Point,
    /// Matched trip cost, infeasible for fallback picks
    pub cost: TripCost,
    /// Whether the vehicle was picked by the fallback policy
    pub fallback: bool,
    /// Whether the ride request reached the vehicle's queue
    pub delivered: bool,
}

/// Matches ride requests to vehicles.
pub struct Dispatcher<O, E> {
    fleet: Arc<FleetRegistry>,
    oracle: O,
    env: E,
    policy: FallbackPolicy,
}

impl<O: RoutingOracle, E: Environment> Dispatcher<O, E> {
    /// Create a dispatcher over `fleet`.
    pub fn new(fleet: Arc<FleetRegistry>, oracle: O, env: E, policy: FallbackPolicy) -> Self {
        Self { fleet, oracle, env, policy }
    }

    /// The fleet this dispatcher draws from.
    pub fn fleet(&self) -> &Arc<FleetRegistry> {
        &self.fleet
    }

    /// Configured fallback policy.
    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    /// Pick a vehicle for a ride from `pickup` to `dropoff` and notify it.
    pub async fn request_ride(
        &self,
        pickup: Point,
        dropoff: Point,
    ) -> Result<Assignment, DispatchError> {
        let started = self.env.now();

        let eligible: Vec<(Arc<VehicleSession>, CostingSnapshot)> = self
            .fleet
            .snapshot()
            .into_iter()
            .filter_map(|session| {
                let snapshot = session.snapshot_for_costing()?;
                Some((session, snapshot))
            })
            .collect();

        if eligible.is_empty() {
            tracing::warn!(fleet_size = self.fleet.len(), "no vehicle with a known location");
            return Err(DispatchError::NoVehicleAvailable);
        }

        let candidates: Vec<Candidate<SessionId>> = eligible
            .iter()
            .map(|(session, snapshot)| Candidate { key: session.id(), snapshot: snapshot.clone() })
            .collect();
        let outcome = find_optimal(&candidates, pickup, dropoff, &self.oracle).await;

        for (session_id, cost) in &outcome.costs {
            tracing::debug!(session_id = *session_id, cost = %cost, "candidate cost");
        }

        let matched = outcome
            .winner
            .and_then(|winner| eligible.iter().find(|(session, _)| session.id() == winner));

        let ((session, snapshot), fallback) = match (matched, self.policy) {
            (Some(entry), _) => (entry, false),
            (None, FallbackPolicy::FirstEligible) => {
                let Some(first) = eligible.first() else {
                    return Err(DispatchError::NoVehicleAvailable);
                };
                tracing::warn!("no optimal vehicle found, falling back to first eligible");
                (first, true)
            },
            (None, FallbackPolicy::Reject) => {
                tracing::warn!("no optimal vehicle found, rejecting ride");
                return Err(DispatchError::NoFeasibleVehicle);
            },
        };

        let delivered = self.deliver(session, pickup, dropoff);
        let elapsed = self.env.now() - started;

        tracing::info!(
            session_id = session.id(),
            cost = %outcome.cost,
            fallback,
            delivered,
            elapsed_ms = elapsed.as_millis() as u64,
            "ride assigned"
        );

        Ok(Assignment {
            session_id: session.id(),
            location: snapshot.location,
            cost: outcome.cost,
            fallback,
            delivered,
        })
    }

    /// Push the ride to `session` if it is still part of the fleet.
    fn deliver(&self, session: &VehicleSession, pickup: Point, dropoff: Point) -> bool {
        if !self.fleet.contains(session.id()) {
            tracing::warn!(
                session_id = session.id(),
                "assigned vehicle disconnected during matching, ride request dropped"
            );
            return false;
        }

        match session.send(ServerPush::RideRequest { pickup, dropoff }) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "ride request not delivered");
                false
            },
        }
    }
}
