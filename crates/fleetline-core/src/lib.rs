//! Fleetline dispatch core.
//!
//! Pure, Sans-IO logic for a ride dispatch service: per-vehicle state, trip
//! costs and the matcher that picks which vehicle serves a ride. Nothing in
//! this crate touches sockets or clocks directly. Routing queries go through
//! the [`RoutingOracle`] trait and time/randomness through [`Environment`],
//! so the runtime in `fleetline-server` and the simulation harness can plug in
//! their own implementations.
//!
//! # Matching
//!
//! For every eligible vehicle the matcher asks the oracle for the duration of
//! a trip that starts at the vehicle's position, visits its outstanding stops
//! in order and ends with the new pickup and dropoff. All queries run
//! concurrently and the vehicle with the strictly smallest finite cost wins.
//! On ties the earlier candidate keeps the win.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod env;
pub mod matcher;
pub mod oracle;
pub mod route;
pub mod vehicle;

pub use env::Environment;
pub use matcher::{Candidate, MatchOutcome, find_optimal, select_best};
pub use oracle::{MIN_WAYPOINTS, RoutingOracle, TripCost};
pub use route::Route;
pub use vehicle::{CostingSnapshot, VehicleState};

/// Identifier of a connected vehicle session.
///
/// Drawn from [`Environment::random_u64`] when the session opens. Zero is
/// never assigned.
pub type SessionId = u64;
