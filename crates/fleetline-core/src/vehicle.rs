//! Per-vehicle state.
//!
//! [`VehicleState`] is what the server knows about one connected vehicle: its
//! last reported position and the stops it still has to visit. It is a plain
//! value; the runtime wraps it in a lock and hands copies of it to the matcher
//! through [`VehicleState::snapshot_for_costing`].
//!
//! # Invariants
//!
//! - A vehicle without a reported location is never eligible for dispatch.
//! - Route order is the order stops were received, minus removals.
//! - Reads (`peek_next_stop`, `snapshot_for_costing`) never modify state.

use fleetline_proto::{Point, Stop};

use crate::route::Route;

/// Server-side view of one vehicle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleState {
    location: Option<Point>,
    location_time: Option<f64>,
    route: Route,
}

impl VehicleState {
    /// A freshly connected vehicle: no location, empty route.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a position report.
    ///
    /// Reports overwrite unconditionally, even when `time` is older than the
    /// previous one.
    pub fn update_location(&mut self, location: Point, time: f64) {
        self.location = Some(location);
        self.location_time = Some(time);
    }

    /// Append a stop to the end of the route.
    pub fn append_stop(&mut self, stop: Stop) {
        self.route.push(stop);
    }

    /// Remove the first exactly-equal stop. Returns whether one was removed.
    pub fn remove_stop(&mut self, stop: &Stop) -> bool {
        self.route.remove_first(stop)
    }

    /// The next stop on the route, if any.
    pub fn peek_next_stop(&self) -> Option<Stop> {
        self.route.peek_next()
    }

    /// Copy of the state the matcher needs, or `None` if the vehicle has not
    /// reported a location yet.
    pub fn snapshot_for_costing(&self) -> Option<CostingSnapshot> {
        let location = self.location?;
        Some(CostingSnapshot { location, route: self.route.as_slice().to_vec() })
    }

    /// Whether this vehicle may be considered for dispatch.
    pub fn is_eligible(&self) -> bool {
        self.location.is_some()
    }

    /// Last reported position.
    pub fn location(&self) -> Option<Point> {
        self.location
    }

    /// Vehicle-side timestamp of the last position report.
    pub fn location_time(&self) -> Option<f64> {
        self.location_time
    }

    /// Outstanding stops.
    pub fn route(&self) -> &Route {
        &self.route
    }
}

/// Point-in-time copy of an eligible vehicle, detached from the live state.
#[derive(Debug, Clone, PartialEq)]
pub struct CostingSnapshot {
    /// Position at snapshot time
    pub location: Point,
    /// Outstanding stops at snapshot time
    pub route: Vec<Stop>,
}

impl CostingSnapshot {
    /// Waypoints for a candidate trip: current location, outstanding stops in
    /// order, then the new pickup and dropoff.
    pub fn waypoints(&self, pickup: Point, dropoff: Point) -> Vec<Point> {
        let mut waypoints = Vec::with_capacity(self.route.len() + 3);
        waypoints.push(self.location);
        waypoints.extend_from_slice(&self.route);
        waypoints.push(pickup);
        waypoints.push(dropoff);
        waypoints
    }
}
