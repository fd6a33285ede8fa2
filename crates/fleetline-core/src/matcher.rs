//! Dispatch matcher.
//!
//! Given a snapshot of eligible vehicles, query the oracle once per vehicle,
//! all concurrently, and pick the cheapest. The matcher only ever sees
//! detached [`CostingSnapshot`]s; whether the winner is still connected by the
//! time the result is known is the caller's problem.

use fleetline_proto::Point;
use futures::future::join_all;

use crate::{
    oracle::{RoutingOracle, TripCost},
    vehicle::CostingSnapshot,
};

/// One vehicle considered for a ride.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<K> {
    /// Caller-chosen identifier, returned in the outcome
    pub key: K,
    /// Vehicle position and route at snapshot time
    pub snapshot: CostingSnapshot,
}

/// Result of a match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome<K> {
    /// Cheapest feasible candidate, if any
    pub winner: Option<K>,
    /// Winner's cost, or [`TripCost::INFEASIBLE`] without a winner
    pub cost: TripCost,
    /// Cost of every candidate, in candidate order
    pub costs: Vec<(K, TripCost)>,
}

impl<K> MatchOutcome<K> {
    /// Outcome with no candidates.
    pub fn empty() -> Self {
        Self { winner: None, cost: TripCost::INFEASIBLE, costs: Vec::new() }
    }
}

/// Pick the cheapest finite cost. Earlier entries win ties.
pub fn select_best<K: Copy>(costs: &[(K, TripCost)]) -> Option<(K, TripCost)> {
    let mut best: Option<(K, TripCost)> = None;
    for &(key, cost) in costs {
        if !cost.is_feasible() {
            continue;
        }
        match best {
            Some((_, current)) if cost.seconds() >= current.seconds() => {},
            _ => best = Some((key, cost)),
        }
    }
    best
}

/// Cost every candidate concurrently and return the cheapest.
///
/// Each candidate's trip is its location, its outstanding stops, `pickup` and
/// `dropoff`, in that order. All queries are issued before any is awaited;
/// the call completes when the slowest one does.
pub async fn find_optimal<K, O>(
    candidates: &[Candidate<K>],
    pickup: Point,
    dropoff: Point,
    oracle: &O,
) -> MatchOutcome<K>
where
    K: Copy,
    O: RoutingOracle + ?Sized,
{
    if candidates.is_empty() {
        return MatchOutcome::empty();
    }

    let queries = candidates.iter().map(|candidate| {
        let waypoints = candidate.snapshot.waypoints(pickup, dropoff);
        async move { oracle.trip_cost(&waypoints).await }
    });
    let results = join_all(queries).await;

    let costs: Vec<(K, TripCost)> =
        candidates.iter().map(|candidate| candidate.key).zip(results).collect();

    match select_best(&costs) {
        Some((winner, cost)) => MatchOutcome { winner: Some(winner), cost, costs },
        None => MatchOutcome { winner: None, cost: TripCost::INFEASIBLE, costs },
    }
}
